//! C ABI wrapper for the Hushtone sound engine.
//!
//! Exposes a small set of functions to create/destroy an engine, play ambient
//! textures and alarm tones by catalog id, stop, and render interleaved f32
//! samples from the host's own audio callback.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `HushtoneEngine` (heap-allocated; you own/delete it).
//! - Sound ids are NUL-terminated UTF-8 strings.
//! - `duration_ms == 0` means "no duration".
//! - Play/stop functions return a status code:
//!   `0` ok, `-1` null argument, `-2` unknown sound id, `-3` wrong sound
//!   category, `-4` audio context unavailable, `-5` any other engine error.
//!
//! Threading
//! - The handle is NOT thread-safe. Control calls and rendering must come from
//!   one thread at a time (the host serializes them).

use std::ffi::{c_char, CStr};

use hushtone_engine::{catalog, EngineConfig, EngineError, OfflineBackend, OfflineTap, SoundEngine};

pub const HUSHTONE_OK: i32 = 0;
pub const HUSHTONE_ERR_NULL: i32 = -1;
pub const HUSHTONE_ERR_UNKNOWN_SOUND: i32 = -2;
pub const HUSHTONE_ERR_WRONG_CATEGORY: i32 = -3;
pub const HUSHTONE_ERR_CONTEXT_UNAVAILABLE: i32 = -4;
pub const HUSHTONE_ERR_ENGINE: i32 = -5;

/// Opaque engine wrapper we hand to C.
///
/// The engine renders into an offline tap; the host pulls samples with
/// `hushtone_render_interleaved_f32` from whatever audio callback it owns.
pub struct HushtoneEngine {
    inner: SoundEngine,
    tap: OfflineTap,
}

impl HushtoneEngine {
    fn new(sample_rate: u32, channels: u16) -> Option<Self> {
        let backend = OfflineBackend::new(sample_rate.max(1), channels.max(1));
        let tap = backend.tap();
        let inner = SoundEngine::new(EngineConfig::default(), Box::new(backend)).ok()?;
        Some(Self { inner, tap })
    }
}

fn status(result: Result<(), EngineError>) -> i32 {
    match result {
        Ok(()) => HUSHTONE_OK,
        Err(EngineError::UnknownSound(_)) => HUSHTONE_ERR_UNKNOWN_SOUND,
        Err(EngineError::NotATexture(_) | EngineError::NotATone(_)) => HUSHTONE_ERR_WRONG_CATEGORY,
        Err(EngineError::ContextUnavailable { .. }) => HUSHTONE_ERR_CONTEXT_UNAVAILABLE,
        Err(_) => HUSHTONE_ERR_ENGINE,
    }
}

fn duration(ms: u32) -> Option<u32> {
    (ms > 0).then_some(ms)
}

/// Borrow the engine and decode the id, or return the null-argument status.
///
/// # Safety
/// `engine` must come from `hushtone_create`; `id` must be NUL-terminated.
unsafe fn args<'a>(engine: *mut HushtoneEngine, id: *const c_char) -> Option<(&'a mut HushtoneEngine, &'a str)> {
    if engine.is_null() || id.is_null() {
        return None;
    }
    let e = unsafe { &mut *engine };
    let id = unsafe { CStr::from_ptr(id) }.to_str().ok()?;
    Some((e, id))
}

// --- Creation / destruction -------------------------------------------------------

/// Create an engine rendering at `sample_rate` Hz into `channels` channels.
/// Returns null on invalid arguments.
#[no_mangle]
pub extern "C" fn hushtone_create(sample_rate: u32, channels: u16) -> *mut HushtoneEngine {
    if sample_rate == 0 || channels == 0 {
        return std::ptr::null_mut();
    }
    match HushtoneEngine::new(sample_rate, channels) {
        Some(e) => Box::into_raw(Box::new(e)),
        None => std::ptr::null_mut(),
    }
}

/// Destroy an engine previously returned by `hushtone_create`.
///
/// # Safety
/// `engine` must be null or a pointer from `hushtone_create` not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn hushtone_destroy(engine: *mut HushtoneEngine) {
    if !engine.is_null() {
        unsafe { drop(Box::from_raw(engine)); }
    }
}

// --- Playback ---------------------------------------------------------------------

/// Play an ambient texture by id. `looping` is ignored when `duration_ms > 0`.
///
/// # Safety
/// `engine` must come from `hushtone_create`; `id` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn hushtone_play_ambient(
    engine: *mut HushtoneEngine,
    id: *const c_char,
    looping: bool,
    duration_ms: u32,
) -> i32 {
    let Some((e, id)) = (unsafe { args(engine, id) }) else { return HUSHTONE_ERR_NULL };
    status(catalog::lookup(id).and_then(|def| e.inner.play_ambient(def, looping, duration(duration_ms))))
}

/// Play an alarm tone by id.
///
/// # Safety
/// `engine` must come from `hushtone_create`; `id` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn hushtone_play_alarm(engine: *mut HushtoneEngine, id: *const c_char, duration_ms: u32) -> i32 {
    let Some((e, id)) = (unsafe { args(engine, id) }) else { return HUSHTONE_ERR_NULL };
    status(catalog::lookup(id).and_then(|def| e.inner.play_alarm_tone(def, duration(duration_ms))))
}

/// Stop whatever is playing. Safe to call repeatedly.
///
/// # Safety
/// `engine` must be null or come from `hushtone_create`.
#[no_mangle]
pub unsafe extern "C" fn hushtone_stop(engine: *mut HushtoneEngine) -> i32 {
    if engine.is_null() { return HUSHTONE_ERR_NULL; }
    let e = unsafe { &mut *engine };
    e.inner.stop();
    HUSHTONE_OK
}

/// 1 while a graph is playing, 0 when idle or on a null handle.
///
/// # Safety
/// `engine` must be null or come from `hushtone_create`.
#[no_mangle]
pub unsafe extern "C" fn hushtone_is_playing(engine: *mut HushtoneEngine) -> i32 {
    if engine.is_null() { return 0; }
    let e = unsafe { &mut *engine };
    i32::from(e.inner.is_playing())
}

// --- Rendering -------------------------------------------------------------------

/// Render `frames` frames into an interleaved f32 buffer sized
/// `frames * channels` (channels as passed to `hushtone_create`).
///
/// Writes straight into the host's buffer without allocating or blocking, so
/// it is safe to call from a realtime callback. Returns the number of frames
/// rendered (0 on error).
///
/// # Safety
/// `out_interleaved` must point to at least `frames * channels` writable floats.
#[no_mangle]
pub unsafe extern "C" fn hushtone_render_interleaved_f32(
    engine: *mut HushtoneEngine,
    out_interleaved: *mut f32,
    frames: u32,
) -> u32 {
    if engine.is_null() || out_interleaved.is_null() || frames == 0 {
        return 0;
    }
    let e = unsafe { &mut *engine };
    let ch = usize::from(e.tap.spec().channels);
    let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, frames as usize * ch) };
    e.tap.render_into(out) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn id(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn lifecycle_and_status_codes() {
        let e = hushtone_create(48_000, 2);
        assert!(!e.is_null());
        unsafe {
            assert_eq!(hushtone_is_playing(e), 0);
            assert_eq!(hushtone_play_ambient(e, id("rain").as_ptr(), true, 0), HUSHTONE_OK);
            assert_eq!(hushtone_is_playing(e), 1);
            assert_eq!(hushtone_play_ambient(e, id("thunder").as_ptr(), true, 0), HUSHTONE_ERR_UNKNOWN_SOUND);
            assert_eq!(hushtone_play_ambient(e, id("classic").as_ptr(), true, 0), HUSHTONE_ERR_WRONG_CATEGORY);
            assert_eq!(hushtone_play_alarm(e, id("ocean").as_ptr(), 0), HUSHTONE_ERR_WRONG_CATEGORY);
            assert_eq!(hushtone_play_alarm(e, std::ptr::null(), 0), HUSHTONE_ERR_NULL);
            assert_eq!(hushtone_stop(e), HUSHTONE_OK);
            assert_eq!(hushtone_stop(e), HUSHTONE_OK);
            assert_eq!(hushtone_is_playing(e), 0);
            hushtone_destroy(e);
        }
    }

    #[test]
    fn bounded_alarm_renders_and_ends() {
        let e = hushtone_create(8_000, 1);
        let mut buf = vec![0.0f32; 800];
        unsafe {
            assert_eq!(hushtone_play_alarm(e, id("gentle").as_ptr(), 100), HUSHTONE_OK);
            assert_eq!(hushtone_render_interleaved_f32(e, buf.as_mut_ptr(), 800), 800);
            assert!(buf.iter().any(|s| *s != 0.0));
            assert_eq!(hushtone_is_playing(e), 0);
            hushtone_destroy(e);
        }
    }

    #[test]
    fn render_writes_interleaved_frames_in_place() {
        let e = hushtone_create(8_000, 2);
        // One spare sample past the requested frames must stay untouched.
        let mut buf = vec![9.0f32; 2 * 400 + 1];
        unsafe {
            assert_eq!(hushtone_play_alarm(e, id("classic").as_ptr(), 0), HUSHTONE_OK);
            assert_eq!(hushtone_render_interleaved_f32(e, buf.as_mut_ptr(), 400), 400);
            hushtone_destroy(e);
        }
        assert_eq!(buf[800], 9.0);
        assert!(buf[..800].chunks(2).all(|f| f[0] == f[1] && f[0].abs() <= 0.3 + 1e-3));
        assert!(buf[..800].iter().any(|s| *s != 0.0));
    }

    #[test]
    fn null_handles_are_tolerated() {
        unsafe {
            assert!(hushtone_create(0, 2).is_null());
            assert_eq!(hushtone_stop(std::ptr::null_mut()), HUSHTONE_ERR_NULL);
            assert_eq!(hushtone_is_playing(std::ptr::null_mut()), 0);
            assert_eq!(hushtone_render_interleaved_f32(std::ptr::null_mut(), std::ptr::null_mut(), 16), 0);
            hushtone_destroy(std::ptr::null_mut());
        }
    }
}
