pub mod client_ip;
pub mod ip_ban;

pub use client_ip::ClientIp;
pub use ip_ban::IpBanList;
