//! Remote key derivation.
//!
//! Maps a local attachment path to its object key in the bucket. Three naming
//! schemes exist in the wild and all stay selectable; which one a deployment
//! uses is fixed at startup. Derivation is pure and referentially transparent:
//! the same path under the same scheme always yields the same key, which is
//! what lets delete-time derivation reproduce upload-time keys exactly.

use std::path::{Component, Path, PathBuf};

use offload_core::{Config, KeyScheme};

/// Key derivation errors.
///
/// These are surfaced, never defaulted: deriving a wrong key silently would
/// orphan objects on upload or delete the wrong objects on teardown.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("path {path} has fewer than two parent segments for year/month derivation")]
    InsufficientDepth { path: PathBuf },

    #[error("anchor segment {anchor:?} not found in path {path}")]
    AnchorNotFound { anchor: String, path: PathBuf },

    #[error("path {path} contains a non-UTF-8 segment")]
    NonUtf8Segment { path: PathBuf },

    #[error("path {path} has no file name")]
    MissingFileName { path: PathBuf },
}

/// Strategy for mapping a local path to a remote key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingScheme {
    /// `prefix/year/month/filename`, with year and month read from the two
    /// trailing segments of the containing directory.
    TimePartitioned { prefix: String },
    /// `prefix/subdir/filename`, with the subdir taken from storage-location
    /// configuration rather than from the path.
    SubdirMirrored { prefix: String, subdir: String },
    /// `prefix/<segments after the anchor>`: the first path component equal
    /// to the anchor is located and everything up to and including it is
    /// replaced by the prefix.
    AnchorRebase { prefix: String, anchor: String },
}

impl NamingScheme {
    /// Build the scheme selected by configuration.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let prefix = config.key_prefix.clone();
        match config.key_scheme {
            KeyScheme::TimePartitioned => Ok(NamingScheme::TimePartitioned { prefix }),
            KeyScheme::SubdirMirrored => {
                let subdir = config.upload_subdir.clone().ok_or_else(|| {
                    anyhow::anyhow!("subdir-mirrored scheme requires UPLOAD_SUBDIR")
                })?;
                Ok(NamingScheme::SubdirMirrored { prefix, subdir })
            }
            KeyScheme::AnchorRebase => Ok(NamingScheme::AnchorRebase {
                prefix,
                anchor: config.rebase_anchor.clone(),
            }),
        }
    }

    /// Derive the remote key for a local path.
    pub fn derive(&self, path: &Path) -> Result<String, KeyError> {
        match self {
            NamingScheme::TimePartitioned { prefix } => {
                let filename = file_name(path)?;
                let (year, month) = trailing_dir_segments(path)?;
                Ok(format!(
                    "{}/{}/{}/{}",
                    trim_prefix(prefix),
                    year,
                    month,
                    filename
                ))
            }
            NamingScheme::SubdirMirrored { prefix, subdir } => {
                let filename = file_name(path)?;
                let subdir = subdir.trim_matches('/');
                if subdir.is_empty() {
                    Ok(format!("{}/{}", trim_prefix(prefix), filename))
                } else {
                    Ok(format!("{}/{}/{}", trim_prefix(prefix), subdir, filename))
                }
            }
            NamingScheme::AnchorRebase { prefix, anchor } => {
                let remainder = segments_after_anchor(path, anchor)?;
                Ok(format!("{}/{}", trim_prefix(prefix), remainder.join("/")))
            }
        }
    }
}

fn trim_prefix(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

fn file_name(path: &Path) -> Result<&str, KeyError> {
    let name = path.file_name().ok_or_else(|| KeyError::MissingFileName {
        path: path.to_path_buf(),
    })?;
    name.to_str().ok_or_else(|| KeyError::NonUtf8Segment {
        path: path.to_path_buf(),
    })
}

/// The two trailing segments of the containing directory, interpreted as
/// year and month.
fn trailing_dir_segments(path: &Path) -> Result<(String, String), KeyError> {
    let parent = path.parent().ok_or_else(|| KeyError::InsufficientDepth {
        path: path.to_path_buf(),
    })?;

    let segments = normal_segments(parent)?;
    if segments.len() < 2 {
        return Err(KeyError::InsufficientDepth {
            path: path.to_path_buf(),
        });
    }

    let month = segments[segments.len() - 1].clone();
    let year = segments[segments.len() - 2].clone();
    Ok((year, month))
}

/// All path segments strictly after the first component equal to `anchor`,
/// file name included.
fn segments_after_anchor(path: &Path, anchor: &str) -> Result<Vec<String>, KeyError> {
    let segments = normal_segments(path)?;
    let anchor_index =
        segments
            .iter()
            .position(|s| s == anchor)
            .ok_or_else(|| KeyError::AnchorNotFound {
                anchor: anchor.to_string(),
                path: path.to_path_buf(),
            })?;

    let remainder = segments[anchor_index + 1..].to_vec();
    if remainder.is_empty() {
        return Err(KeyError::MissingFileName {
            path: path.to_path_buf(),
        });
    }
    Ok(remainder)
}

fn normal_segments(path: &Path) -> Result<Vec<String>, KeyError> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(
                segment
                    .to_str()
                    .map(str::to_string)
                    .ok_or_else(|| KeyError::NonUtf8Segment {
                        path: path.to_path_buf(),
                    }),
            ),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_partitioned() -> NamingScheme {
        NamingScheme::TimePartitioned {
            prefix: "media".to_string(),
        }
    }

    #[test]
    fn time_partitioned_composes_year_month_filename() {
        let scheme = time_partitioned();
        let key = scheme
            .derive(Path::new("/var/www/uploads/2024/03/photo.jpg"))
            .unwrap();
        assert_eq!(key, "media/2024/03/photo.jpg");
    }

    #[test]
    fn time_partitioned_covers_the_whole_derivative_set() {
        let scheme = time_partitioned();
        let keys: Vec<String> = [
            "/uploads/2024/03/photo.jpg",
            "/uploads/2024/03/photo-150x150.jpg",
            "/uploads/2024/03/photo-300x300.jpg",
        ]
        .iter()
        .map(|p| scheme.derive(Path::new(p)).unwrap())
        .collect();
        assert_eq!(
            keys,
            [
                "media/2024/03/photo.jpg",
                "media/2024/03/photo-150x150.jpg",
                "media/2024/03/photo-300x300.jpg",
            ]
        );
    }

    #[test]
    fn time_partitioned_requires_two_parent_segments() {
        let scheme = time_partitioned();
        let err = scheme.derive(Path::new("/2024/photo.jpg")).unwrap_err();
        assert!(matches!(err, KeyError::InsufficientDepth { .. }));

        let err = scheme.derive(Path::new("/photo.jpg")).unwrap_err();
        assert!(matches!(err, KeyError::InsufficientDepth { .. }));
    }

    #[test]
    fn subdir_mirrored_ignores_path_directories() {
        let scheme = NamingScheme::SubdirMirrored {
            prefix: "media".to_string(),
            subdir: "/2024/03/".to_string(),
        };
        let key = scheme
            .derive(Path::new("/srv/app/current-uploads/photo-300x300.jpg"))
            .unwrap();
        assert_eq!(key, "media/2024/03/photo-300x300.jpg");
    }

    #[test]
    fn subdir_mirrored_tolerates_empty_subdir() {
        let scheme = NamingScheme::SubdirMirrored {
            prefix: "media".to_string(),
            subdir: String::new(),
        };
        let key = scheme.derive(Path::new("/srv/photo.jpg")).unwrap();
        assert_eq!(key, "media/photo.jpg");
    }

    #[test]
    fn anchor_rebase_preserves_everything_after_the_anchor() {
        let scheme = NamingScheme::AnchorRebase {
            prefix: "media".to_string(),
            anchor: "uploads".to_string(),
        };
        let key = scheme
            .derive(Path::new("/var/www/html/wp-content/uploads/2024/03/photo.jpg"))
            .unwrap();
        assert_eq!(key, "media/2024/03/photo.jpg");
    }

    #[test]
    fn anchor_rebase_matches_whole_segments_only() {
        // A directory merely containing the anchor as a substring must not match.
        let scheme = NamingScheme::AnchorRebase {
            prefix: "media".to_string(),
            anchor: "uploads".to_string(),
        };
        let err = scheme
            .derive(Path::new("/var/www/old-uploads/2024/photo.jpg"))
            .unwrap_err();
        assert!(matches!(err, KeyError::AnchorNotFound { .. }));
    }

    #[test]
    fn anchor_rebase_missing_anchor_is_an_error() {
        let scheme = NamingScheme::AnchorRebase {
            prefix: "media".to_string(),
            anchor: "uploads".to_string(),
        };
        let err = scheme
            .derive(Path::new("/var/www/html/media/photo.jpg"))
            .unwrap_err();
        assert!(matches!(
            err,
            KeyError::AnchorNotFound { ref anchor, .. } if anchor == "uploads"
        ));
    }

    #[test]
    fn anchor_with_nothing_after_it_is_an_error() {
        let scheme = NamingScheme::AnchorRebase {
            prefix: "media".to_string(),
            anchor: "uploads".to_string(),
        };
        let err = scheme.derive(Path::new("/var/www/uploads")).unwrap_err();
        assert!(matches!(err, KeyError::MissingFileName { .. }));
    }

    #[test]
    fn prefix_slashes_are_normalized() {
        let scheme = NamingScheme::TimePartitioned {
            prefix: "/media/".to_string(),
        };
        let key = scheme
            .derive(Path::new("/uploads/2024/03/photo.jpg"))
            .unwrap();
        assert_eq!(key, "media/2024/03/photo.jpg");
    }

    #[test]
    fn scheme_construction_from_config() {
        let mut config = Config {
            storage_backend: offload_core::StorageBackend::Memory,
            region: None,
            bucket: "media-bucket".to_string(),
            bucket_url: "https://media-bucket.s3.amazonaws.com".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            key_scheme: KeyScheme::AnchorRebase,
            key_prefix: "media".to_string(),
            upload_subdir: None,
            rebase_anchor: "uploads".to_string(),
            current_upload_dir: None,
            delete_local_after_upload: false,
        };

        assert_eq!(
            NamingScheme::from_config(&config).unwrap(),
            NamingScheme::AnchorRebase {
                prefix: "media".to_string(),
                anchor: "uploads".to_string(),
            }
        );

        config.key_scheme = KeyScheme::SubdirMirrored;
        assert!(NamingScheme::from_config(&config).is_err());

        config.upload_subdir = Some("2024/03".to_string());
        assert_eq!(
            NamingScheme::from_config(&config).unwrap(),
            NamingScheme::SubdirMirrored {
                prefix: "media".to_string(),
                subdir: "2024/03".to_string(),
            }
        );
    }

    #[test]
    fn derivation_is_stable_across_calls() {
        let scheme = time_partitioned();
        let path = Path::new("/uploads/2024/03/photo.jpg");
        let first = scheme.derive(path).unwrap();
        for _ in 0..10 {
            assert_eq!(scheme.derive(path).unwrap(), first);
        }
    }
}
