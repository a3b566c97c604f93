use serlink_transport::SerialDevice;

use crate::cancel::CancelToken;
use crate::config::LinkConfig;
use crate::connection::Connection;
use crate::error::{LinkError, Result};

/// Open the configured serial device and establish the link.
///
/// Device failures, a port already held by another handle included, map
/// to [`LinkError::DeviceUnavailable`].
pub fn open(config: LinkConfig) -> Result<Connection<SerialDevice>> {
    open_with_cancel(config, CancelToken::new())
}

/// Like [`open`], with a caller-supplied cancel token that also bounds
/// the handshake.
pub fn open_with_cancel(
    config: LinkConfig,
    cancel: CancelToken,
) -> Result<Connection<SerialDevice>> {
    config.validate()?;
    let device = SerialDevice::open(&config.device, config.baud_rate)
        .map_err(LinkError::DeviceUnavailable)?;

    let mut connection = Connection::new(config, device)?.with_cancel_token(cancel);
    connection.open()?;
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use serlink_transport::TransportError;

    use super::*;
    use crate::config::Role;

    #[test]
    fn missing_device_is_unavailable() {
        let path = std::env::temp_dir().join(format!(
            "serlink-missing-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        let config = LinkConfig::new(path.to_string_lossy(), Role::Initiator);

        let err = open(config).unwrap_err();
        assert!(
            matches!(err, LinkError::DeviceUnavailable(TransportError::Open { .. })),
            "{err:?}"
        );
    }

    #[test]
    fn invalid_config_is_checked_before_the_device() {
        let config = LinkConfig::new("", Role::Responder);
        assert!(matches!(open(config), Err(LinkError::InvalidConfig(_))));
    }
}
