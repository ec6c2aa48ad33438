//! Realtime output through CPAL.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::backend::{OutputBackend, StreamSpec};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::render::Renderer;

/// Names of the host's output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.output_devices().map_err(|e| EngineError::Stream(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

fn pick_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(wanted) = name {
        let devices = host.output_devices().map_err(|e| EngineError::Stream(e.to_string()))?;
        for d in devices {
            if d.name().is_ok_and(|n| n.contains(wanted)) {
                return Ok(d);
            }
        }
        return Err(EngineError::DeviceNotFound(wanted.to_string()));
    }
    host.default_output_device().ok_or(EngineError::NoDevice)
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    if req_sr.is_none() && req_ch.is_none() {
        return device.default_output_config().map_err(|e| EngineError::Stream(e.to_string()));
    }
    let ranges = device.supported_output_configs().map_err(|e| EngineError::Stream(e.to_string()))?;
    closest_config(ranges, req_sr, req_ch).ok_or_else(|| EngineError::Stream("no supported output configs".into()))
}

/// Pick the supported range closest to the request and settle on a rate in it.
///
/// Sample-rate distance dominates channel distance. The result always carries
/// the range's own channel count, never the requested one.
fn closest_config(
    ranges: impl IntoIterator<Item = cpal::SupportedStreamConfigRange>,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Option<cpal::SupportedStreamConfig> {
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in ranges {
        let lo = range.min_sample_rate().0;
        let hi = range.max_sample_rate().0;
        let ch_pen = req_ch.map_or(0, |c| u64::from(range.channels().abs_diff(c)));
        let sr_pen = req_sr.map_or(0, |sr| {
            if (lo..=hi).contains(&sr) { 0 } else { u64::from(lo.abs_diff(sr).min(hi.abs_diff(sr))) }
        });
        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best?;
    let sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Some(range.with_sample_rate(sr))
}

/// Format the renderer is built for: whatever the device agreed to.
fn stream_spec(supported: &cpal::SupportedStreamConfig) -> StreamSpec {
    StreamSpec { sample_rate: supported.sample_rate().0, channels: supported.channels() }
}

fn build_stream<T>(device: &cpal::Device, cfg: &cpal::StreamConfig, mut renderer: Renderer) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels.max(1));
    let err_fn = |e: cpal::StreamError| tracing::warn!(error = %e, "output stream error");

    device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _| {
                renderer.begin_block();
                for frame in output.chunks_mut(channels) {
                    let v = T::from_sample(renderer.next_sample());
                    frame.fill(v);
                }
                renderer.end_block();
            },
            err_fn,
            None,
        )
        .map_err(|e| EngineError::Stream(e.to_string()))
}

/// Output on a system audio device.
///
/// The device is picked when the context opens, so a missing device surfaces
/// on the first play request rather than at construction.
pub struct CpalBackend {
    name: String,
    want_device: Option<String>,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
    device: Option<(cpal::Device, cpal::SupportedStreamConfig)>,
    stream: Option<cpal::Stream>,
    suspended: bool,
}

impl CpalBackend {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            name: config.device.clone().unwrap_or_else(|| "default output".to_string()),
            want_device: config.device.clone(),
            req_sr: config.sample_rate,
            req_ch: config.channels,
            device: None,
            stream: None,
            suspended: false,
        }
    }
}

impl OutputBackend for CpalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<StreamSpec> {
        let device = pick_device(self.want_device.as_deref())?;
        let supported = choose_config(&device, self.req_sr, self.req_ch)?;
        let spec = stream_spec(&supported);
        if let Ok(name) = device.name() {
            self.name = name;
        }
        if self.req_ch.is_some_and(|ch| ch != spec.channels) {
            tracing::info!(requested = ?self.req_ch, channels = spec.channels, "using the device's channel count");
        }
        self.device = Some((device, supported));
        Ok(spec)
    }

    fn start(&mut self, renderer: Renderer) -> Result<()> {
        let (device, supported) = self
            .device
            .as_ref()
            .ok_or_else(|| EngineError::Stream("backend started before open".into()))?;
        let cfg = supported.config();
        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(device, &cfg, renderer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(device, &cfg, renderer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(device, &cfg, renderer)?,
            other => return Err(EngineError::UnsupportedFormat(format!("{other:?}"))),
        };
        stream.play().map_err(|e| EngineError::Stream(e.to_string()))?;
        tracing::info!(device = %self.name, ?cfg, "output stream started");
        self.stream = Some(stream);
        self.suspended = false;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.pause().map_err(|e| EngineError::Stream(e.to_string()))?;
        }
        self.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.play().map_err(|e| EngineError::Stream(e.to_string()))?;
        }
        self.suspended = false;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }
}
