pub mod clash;
pub mod loon;
pub mod quanx;
pub mod singbox;
pub mod single;
pub mod surge;

// Re-export all format converters
pub use clash::{proxy_to_clash, proxy_to_clash_mapping};
pub use loon::{proxy_to_loon, proxy_to_loon_line};
pub use quanx::{proxy_to_quanx, proxy_to_quanx_line};
pub use singbox::{proxy_to_outbound, proxy_to_singbox};
pub use single::{proxy_to_link, proxy_to_single};
pub use surge::{proxy_to_surge, proxy_to_surge_line};
