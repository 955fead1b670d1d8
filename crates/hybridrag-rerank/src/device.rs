use candle_core::Device;
use tracing::info;

use hybridrag_core::{Error, Result};

/// Resolves `reranker.device`: `cpu`, `cuda[:N]`, `metal`, or unset/`auto`
/// for the best compiled-in accelerator with CPU fallback.
pub fn select_device(preference: Option<&str>) -> Result<Device> {
    let pref = preference.map(|p| p.trim().to_ascii_lowercase()).unwrap_or_else(|| "auto".to_string());
    let device = match pref.as_str() {
        "cpu" => Device::Cpu,
        "metal" | "mps" => Device::new_metal(0).map_err(|e| Error::RerankerInit(format!("metal device unavailable: {e}")))?,
        "auto" | "" => auto_device(),
        other if other.starts_with("cuda") => {
            let ordinal = other.strip_prefix("cuda").and_then(|s| s.strip_prefix(':')).map(str::parse::<usize>).transpose().map_err(|e| Error::RerankerInit(format!("invalid cuda ordinal in '{other}': {e}")))?.unwrap_or(0);
            Device::new_cuda(ordinal).map_err(|e| Error::RerankerInit(format!("cuda device {ordinal} unavailable: {e}")))?
        }
        other => return Err(Error::RerankerInit(format!("unknown device '{other}'"))),
    };
    info!(device = ?device, "reranker device selected");
    Ok(device)
}

fn auto_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(dev) = Device::new_cuda(0) { return dev; }
    }
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) { return dev; }
    }
    Device::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_and_auto_always_work() {
        assert!(matches!(select_device(Some("cpu")), Ok(Device::Cpu)));
        assert!(select_device(None).is_ok());
    }

    #[test]
    fn unknown_device_is_an_init_error() {
        assert!(matches!(select_device(Some("tpu")), Err(Error::RerankerInit(_))));
    }
}
