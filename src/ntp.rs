// Minimal SNTP (RFC 4330) client: one request, one reply, one socket per query.
// Only the server's transmit timestamp is used.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::TimeError;

pub const NTP_PORT: u16 = 123;
pub const PACKET_LEN: usize = 48;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;
const ERA_SECONDS: i64 = 1 << 32;

const VERSION: u8 = 4;
const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const LEAP_ALARM: u8 = 3;

/// Source of authoritative UTC time.
#[async_trait]
pub trait NtpClient: Send + Sync {
    /// Ask `host` for the current time. Each call is a single exchange.
    async fn query(&self, host: &str) -> Result<DateTime<Utc>, TimeError>;
}

/// 64-bit NTP timestamp: seconds since 1900 plus a 32-bit binary fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpTimestamp {
    pub seconds: u32,
    pub fraction: u32,
}

impl NtpTimestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let seconds = (dt.timestamp() + NTP_UNIX_OFFSET).rem_euclid(ERA_SECONDS) as u32;
        let fraction = ((u64::from(dt.timestamp_subsec_nanos()) << 32) / 1_000_000_000) as u32;
        Self { seconds, fraction }
    }

    /// Convert to UTC. Timestamps with the high bit clear are taken to be in
    /// era 1 (on or after 2036-02-07T06:28:16Z).
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let mut secs = i64::from(self.seconds);
        if self.seconds & 0x8000_0000 == 0 {
            secs += ERA_SECONDS;
        }
        let nanos = ((u64::from(self.fraction) * 1_000_000_000) >> 32) as u32;
        DateTime::from_timestamp(secs - NTP_UNIX_OFFSET, nanos)
    }

    pub fn is_zero(self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.seconds.to_be_bytes());
        out[4..].copy_from_slice(&self.fraction.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let word = |i: usize| {
            u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
        };
        Self {
            seconds: word(0),
            fraction: word(4),
        }
    }
}

/// Build a client request whose transmit timestamp is `sent_at`.
pub fn encode_request(sent_at: DateTime<Utc>) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = (VERSION << 3) | MODE_CLIENT;
    packet[40..48].copy_from_slice(&NtpTimestamp::from_datetime(sent_at).to_bytes());
    packet
}

/// Validate a server reply to `request` and extract its transmit time.
pub fn decode_reply(reply: &[u8], request: &[u8; PACKET_LEN]) -> Result<DateTime<Utc>, String> {
    if reply.len() < PACKET_LEN {
        return Err(format!("short reply: {} bytes", reply.len()));
    }

    let leap = reply[0] >> 6;
    let mode = reply[0] & 0x07;
    let stratum = reply[1];

    if mode != MODE_SERVER {
        return Err(format!("unexpected mode {mode} in reply"));
    }
    if stratum == 0 {
        let code = String::from_utf8_lossy(&reply[12..16]);
        return Err(format!("kiss-o'-death: {}", code.trim_end_matches('\0')));
    }
    if leap == LEAP_ALARM {
        return Err("server clock is not synchronized".to_string());
    }
    if reply[24..32] != request[40..48] {
        return Err("originate timestamp does not match request".to_string());
    }

    let transmit = NtpTimestamp::from_bytes(&reply[40..48]);
    if transmit.is_zero() {
        return Err("zero transmit timestamp".to_string());
    }
    transmit
        .to_datetime()
        .ok_or_else(|| "transmit timestamp out of range".to_string())
}

/// UDP SNTP client with a per-query timeout.
#[derive(Debug, Clone)]
pub struct SntpClient {
    timeout: Duration,
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl SntpClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(&self, host: &str) -> Result<DateTime<Utc>, TimeError> {
        let addr = resolve_addr(host).await?;
        let local: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| TimeError::protocol(host, format!("bind failed: {e}")))?;
        socket
            .connect(addr)
            .await
            .map_err(|e| TimeError::protocol(host, format!("connect to {addr} failed: {e}")))?;

        let request = encode_request(Utc::now());
        socket
            .send(&request)
            .await
            .map_err(|e| TimeError::protocol(host, format!("send failed: {e}")))?;

        // Room for extension fields and MACs some servers append.
        let mut buf = [0u8; 512];
        let len = socket
            .recv(&mut buf)
            .await
            .map_err(|e| TimeError::protocol(host, format!("receive failed: {e}")))?;
        debug!(%addr, len, "received NTP reply");

        decode_reply(&buf[..len], &request).map_err(|reason| TimeError::protocol(host, reason))
    }
}

#[async_trait]
impl NtpClient for SntpClient {
    async fn query(&self, host: &str) -> Result<DateTime<Utc>, TimeError> {
        match tokio::time::timeout(self.timeout, self.exchange(host)).await {
            Ok(result) => result,
            Err(_) => Err(TimeError::RemoteTimeout {
                host: host.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

/// Accepts `host`, `host:port`, an IP literal or a socket address literal.
async fn resolve_addr(host: &str) -> Result<SocketAddr, TimeError> {
    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, NTP_PORT));
    }

    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(name, port)| !name.contains(':') && port.parse::<u16>().is_ok());
    let target = if has_port {
        host.to_string()
    } else {
        format!("{host}:{NTP_PORT}")
    };

    tokio::net::lookup_host(target)
        .await
        .map_err(|e| TimeError::protocol(host, format!("cannot resolve host: {e}")))?
        .next()
        .ok_or_else(|| TimeError::protocol(host, "host resolved to no addresses"))
}
