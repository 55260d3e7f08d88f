pub struct FileSizeUtils;

impl FileSizeUtils {
    /// Size as shown next to each queued document, always in megabytes.
    pub fn format_megabytes(size_bytes: u64) -> String {
        format!("{:.2} MB", size_bytes as f64 / 1024.0 / 1024.0)
    }

    /// Combined size of the queued documents.
    pub fn total_megabytes<I>(sizes: I) -> String
    where
        I: IntoIterator<Item = u64>,
    {
        Self::format_megabytes(sizes.into_iter().sum())
    }
}
