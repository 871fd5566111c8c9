/// Kind of source handed to [`add_nodes`](super::subparser::add_nodes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfType {
    /// A single share-link
    Link,
    /// A remote subscription fetched over HTTP
    Sub,
    /// A subscription document on disk
    Local,
}
