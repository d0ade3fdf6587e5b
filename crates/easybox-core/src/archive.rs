#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArchiveType {
    Zip,
    TarGz,
    TarZst,
}

impl ArchiveType {
    pub const ALL: [ArchiveType; 3] = [Self::Zip, Self::TarGz, Self::TarZst];

    /// Extension used for the cached artifact file, without the leading dot.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
        }
    }

    pub fn infer_from_url(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        let without_fragment = lower.split('#').next().unwrap_or(&lower);
        let without_query = without_fragment
            .split('?')
            .next()
            .unwrap_or(without_fragment);

        if without_query.ends_with(".zip") {
            return Some(Self::Zip);
        }
        if without_query.ends_with(".tar.gz") || without_query.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        if without_query.ends_with(".tar.zst") || without_query.ends_with(".tzst") {
            return Some(Self::TarZst);
        }

        None
    }

    /// Archive type for a locator, falling back to `tar.gz` when the URL
    /// carries no recognizable extension.
    pub fn for_locator(url: &str) -> Self {
        Self::infer_from_url(url).unwrap_or(Self::TarGz)
    }
}
