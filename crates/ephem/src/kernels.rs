use std::path::{Path, PathBuf};

use crate::EphemerisError;

/// Location where SPICE kernels are expected to live.
pub const LOCAL_SPICE_DIR: &str = "data/spice";

/// Metadata describing a SPICE kernel the provider needs.
#[derive(Debug, Clone, Copy)]
pub struct KernelDescriptor {
    pub filename: &'static str,
    /// NAIF download location, reported when the file is absent.
    pub url: &'static str,
}

impl KernelDescriptor {
    /// Returns the on-disk path where the kernel should reside.
    pub fn local_path(self) -> PathBuf {
        self.path_in(Path::new(LOCAL_SPICE_DIR))
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.filename)
    }
}

/// Kernels covering heliocentric planet-system barycenters.
pub const KERNEL_CATALOG: &[KernelDescriptor] = &[
    KernelDescriptor {
        filename: "de440s.bsp",
        url: "https://naif.jpl.nasa.gov/pub/naif/generic_kernels/spk/planets/de440s.bsp",
    },
    KernelDescriptor {
        filename: "naif0012.tls",
        url: "https://naif.jpl.nasa.gov/pub/naif/generic_kernels/lsk/naif0012.tls",
    },
    KernelDescriptor {
        filename: "pck00011.tpc",
        url: "https://naif.jpl.nasa.gov/pub/naif/generic_kernels/pck/pck00011.tpc",
    },
];

/// Check that every catalogued kernel exists under `dir`.
///
/// The first missing file is reported together with the URL it can be
/// fetched from.
pub fn ensure_present(dir: &Path) -> Result<(), EphemerisError> {
    for descriptor in KERNEL_CATALOG {
        let path = descriptor.path_in(dir);
        if !path.exists() {
            return Err(EphemerisError::MissingKernel {
                name: descriptor.filename,
                path,
                url: descriptor.url,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_kernel_points_at_its_download() {
        let dir = Path::new("data/no-such-spice-dir");
        let err = ensure_present(dir).unwrap_err();
        match &err {
            EphemerisError::MissingKernel { name, path, url } => {
                assert_eq!(*name, "de440s.bsp");
                assert_eq!(path, &dir.join("de440s.bsp"));
                assert!(url.ends_with("/spk/planets/de440s.bsp"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("de440s.bsp"));
        assert!(message.contains("https://naif.jpl.nasa.gov/"));
    }

    #[test]
    fn catalog_files_resolve_under_the_local_directory() {
        for descriptor in KERNEL_CATALOG {
            assert_eq!(
                descriptor.local_path(),
                Path::new(LOCAL_SPICE_DIR).join(descriptor.filename)
            );
            assert!(descriptor.url.ends_with(descriptor.filename));
        }
    }
}
