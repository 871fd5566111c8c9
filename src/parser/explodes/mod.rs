//! Share-link decoders and the per-protocol field builders container
//! decoders reuse.

pub mod anytls;
pub mod common;
pub mod http;
pub mod hysteria;
pub mod snell;
pub mod socks;
pub mod ss;
pub mod ssr;
pub mod trojan;
pub mod tuic;
pub mod vless;
pub mod vmess;
pub mod wireguard;

pub use anytls::explode_anytls;
pub use http::{explode_http, explode_http_telegram};
pub use hysteria::explode_hysteria;
pub use snell::explode_snell;
pub use socks::{explode_socks, explode_socks_telegram};
pub use ss::explode_ss;
pub use ssr::explode_ssr;
pub use trojan::explode_trojan;
pub use tuic::explode_tuic;
pub use vless::explode_vless;
pub use vmess::{explode_vmess, explode_vmess1};
pub use wireguard::explode_wireguard;
