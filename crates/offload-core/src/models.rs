//! Domain models for attachment offloading.
//!
//! An attachment is a logical media item owned by the host: one main file plus
//! zero or more generated size variants ("derivatives"). The host remains the
//! owner of attachment metadata; these types are read-side views built per
//! lifecycle event and never persisted here.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque attachment identifier assigned by the host media library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub i64);

impl From<i64> for AttachmentId {
    fn from(id: i64) -> Self {
        AttachmentId(id)
    }
}

impl Display for AttachmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Descriptor of one generated size variant, as registered by the host.
///
/// A descriptor without a `file` entry is a normal condition (the size was
/// registered but never generated) and is skipped during resolution, not
/// treated as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl SizeDescriptor {
    pub fn with_file(file: impl Into<String>) -> Self {
        SizeDescriptor {
            file: Some(file.into()),
            width: None,
            height: None,
        }
    }
}

/// Attachment metadata as delivered by the host's update event.
///
/// `sizes` keeps the host's enumeration order; the JSON form is a map keyed by
/// size label (e.g. `"thumbnail"`), so (de)serialization goes through a
/// custom map codec rather than losing order in a sorted map type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMetadata {
    pub sizes: Vec<(String, SizeDescriptor)>,
}

impl AttachmentMetadata {
    pub fn size(&self, label: &str) -> Option<&SizeDescriptor> {
        self.sizes
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, d)| d)
    }
}

impl Serialize for AttachmentMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Outer<'a> {
            sizes: SizesMap<'a>,
        }
        struct SizesMap<'a>(&'a [(String, SizeDescriptor)]);
        impl Serialize for SizesMap<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (label, descriptor) in self.0 {
                    map.serialize_entry(label, descriptor)?;
                }
                map.end()
            }
        }
        Outer {
            sizes: SizesMap(&self.sizes),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttachmentMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Outer {
            #[serde(default, deserialize_with = "sizes_in_order")]
            sizes: Vec<(String, SizeDescriptor)>,
        }

        fn sizes_in_order<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<(String, SizeDescriptor)>, D::Error> {
            struct SizesVisitor;
            impl<'de> Visitor<'de> for SizesVisitor {
                type Value = Vec<(String, SizeDescriptor)>;

                fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
                    f.write_str("a map of size label to size descriptor")
                }

                fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                    let mut sizes = Vec::with_capacity(map.size_hint().unwrap_or(0));
                    while let Some(entry) = map.next_entry::<String, SizeDescriptor>()? {
                        sizes.push(entry);
                    }
                    Ok(sizes)
                }
            }
            deserializer.deserialize_map(SizesVisitor)
        }

        let outer = Outer::deserialize(deserializer)?;
        Ok(AttachmentMetadata { sizes: outer.sizes })
    }
}

/// The complete, de-duplicated set of local files belonging to one attachment.
///
/// Ordering is significant: main file first, then derivatives in resolver
/// enumeration order. Upload and delete operate on the identical set so the
/// remote key sets match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSet {
    paths: Vec<PathBuf>,
}

impl UploadSet {
    pub fn new() -> Self {
        UploadSet { paths: Vec::new() }
    }

    /// Append a path unless it is already present.
    pub fn push(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

impl FromIterator<PathBuf> for UploadSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut set = UploadSet::new();
        for path in iter {
            set.push(path);
        }
        set
    }
}

/// The host's upload-directory description, as handed to the URL-rewrite hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDirs {
    /// Externally visible URL of the current upload directory.
    pub url: String,
    /// Externally visible base URL of the uploads root.
    pub base_url: String,
    /// Relative subdirectory under the uploads root (e.g. `2024/03`).
    pub subdir: String,
}
