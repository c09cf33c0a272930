//! CSPICE-backed ephemeris provider.
//!
//! States are requested heliocentrically in `J2000` (equatorial) without
//! aberration corrections. Ephemeris time is read directly from the epoch's
//! seconds past J2000.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use cspice_sys::{
    SpiceBoolean, SpiceDouble, SpiceInt, erract_c, failed_c, furnsh_c, getmsg_c, kclear_c,
    reset_c, spkezr_c,
};
use swingby_core::time::Epoch;

use crate::kernels::{self, KERNEL_CATALOG, KernelDescriptor, LOCAL_SPICE_DIR};
use crate::{BodyId, BodyState, EphemerisError, EphemerisProvider, Frame};

static INITIALIZED: OnceLock<()> = OnceLock::new();
static INITIALIZE_LOCK: Mutex<()> = Mutex::new(());

/// Provider reading the kernels listed in [`KERNEL_CATALOG`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SpiceEphemeris;

impl SpiceEphemeris {
    /// Load the kernels up front so missing files surface before a mission starts.
    pub fn new() -> Result<Self, EphemerisError> {
        load_default_kernels()?;
        Ok(Self)
    }
}

impl EphemerisProvider for SpiceEphemeris {
    fn state(&self, body: BodyId, epoch: Epoch) -> Result<BodyState, EphemerisError> {
        if body == BodyId::Sun {
            return Ok(BodyState {
                position_km: [0.0; 3],
                velocity_km_s: [0.0; 3],
                frame: Frame::EquatorialJ2000,
            });
        }
        load_default_kernels()?;
        let (position_km, velocity_km_s) =
            heliocentric_state(body.spice_target(), epoch.seconds_past_j2000())?;
        Ok(BodyState {
            position_km,
            velocity_km_s,
            frame: Frame::EquatorialJ2000,
        })
    }

    fn name(&self) -> &str {
        "SPICE"
    }
}

/// Ensure the CSPICE runtime has all required kernels loaded.
pub fn load_default_kernels() -> Result<(), EphemerisError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }
    let _lock = INITIALIZE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if INITIALIZED.get().is_some() {
        return Ok(());
    }
    initialize_spice()?;
    let _ = INITIALIZED.set(());
    log::info!("loaded {} SPICE kernels", KERNEL_CATALOG.len());
    Ok(())
}

fn c_string(text: &str) -> Result<CString, EphemerisError> {
    CString::new(text).map_err(|_| EphemerisError::Spice {
        message: format!("string `{text}` contains an interior NUL"),
    })
}

fn heliocentric_state(
    target: &str,
    ephemeris_time: SpiceDouble,
) -> Result<([f64; 3], [f64; 3]), EphemerisError> {
    let target_c = c_string(target)?;
    let observer_c = c_string("SUN")?;
    let frame_c = c_string("J2000")?;
    let aberration_c = c_string("NONE")?;

    let mut state: [SpiceDouble; 6] = [0.0; 6];
    let mut light_time: SpiceDouble = 0.0;
    unsafe {
        spkezr_c(
            target_c.as_ptr() as *mut i8,
            ephemeris_time,
            frame_c.as_ptr() as *mut i8,
            aberration_c.as_ptr() as *mut i8,
            observer_c.as_ptr() as *mut i8,
            state.as_mut_ptr(),
            &mut light_time,
        );
    }
    check_for_spice_error()?;

    Ok((
        [state[0], state[1], state[2]],
        [state[3], state[4], state[5]],
    ))
}

fn initialize_spice() -> Result<(), EphemerisError> {
    kernels::ensure_present(Path::new(LOCAL_SPICE_DIR))?;
    unsafe {
        kclear_c();
    }
    configure_error_handling();
    for descriptor in KERNEL_CATALOG {
        let c_path = path_to_cstring(descriptor)?;
        unsafe {
            furnsh_c(c_path.as_ptr() as *mut i8);
        }
        check_for_spice_error()?;
    }
    Ok(())
}

fn path_to_cstring(descriptor: &KernelDescriptor) -> Result<CString, EphemerisError> {
    let path = descriptor.local_path();
    let path_str = path
        .to_str()
        .ok_or_else(|| EphemerisError::InvalidKernelPath {
            name: descriptor.filename,
            path: path.clone(),
        })?;
    CString::new(path_str).map_err(|_| EphemerisError::InvalidKernelPath {
        name: descriptor.filename,
        path,
    })
}

fn configure_error_handling() {
    const SET: &[u8] = b"SET\0";
    const RETURN_MODE: &[u8] = b"RETURN\0";
    unsafe {
        erract_c(
            SET.as_ptr() as *mut i8,
            0 as SpiceInt,
            RETURN_MODE.as_ptr() as *mut i8,
        );
    }
}

fn check_for_spice_error() -> Result<(), EphemerisError> {
    unsafe {
        if failed_c() != 0 as SpiceBoolean {
            const LONG: &[u8] = b"LONG\0";
            let mut buffer = vec![0i8; 1024];
            getmsg_c(
                LONG.as_ptr() as *mut i8,
                buffer.len() as SpiceInt,
                buffer.as_mut_ptr(),
            );
            reset_c();
            let message = CStr::from_ptr(buffer.as_ptr())
                .to_string_lossy()
                .trim()
                .to_string();
            return Err(EphemerisError::Spice { message });
        }
    }
    Ok(())
}
