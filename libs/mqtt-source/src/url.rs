use crate::SourceError;

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TLS_PORT: u16 = 8883;

/// Where to connect, resolved from a profile URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

/// Parse `mqtt://host[:port]`, `mqtts://host[:port]` or a bare `host[:port]`.
pub fn parse_broker_url(url: &str) -> Result<BrokerAddress, SourceError> {
    let trimmed = url.trim();
    let (rest, tls) = if let Some(rest) = trimmed.strip_prefix("mqtts://") {
        (rest, true)
    } else if let Some(rest) = trimmed.strip_prefix("mqtt://") {
        (rest, false)
    } else {
        (trimmed, false)
    };

    let parts: Vec<&str> = rest.split(':').collect();
    let (host, port) = match parts.as_slice() {
        [host] => (*host, if tls { DEFAULT_TLS_PORT } else { DEFAULT_PORT }),
        [host, port] => {
            let port = port
                .parse::<u16>()
                .map_err(|_| SourceError::InvalidPort((*port).to_string()))?;
            (*host, port)
        }
        _ => return Err(SourceError::InvalidUrl(url.to_string())),
    };

    if host.is_empty() {
        return Err(SourceError::InvalidUrl(url.to_string()));
    }

    Ok(BrokerAddress {
        host: host.to_string(),
        port,
        tls,
    })
}
