pub mod input;

use crate::error::{DeckError, Result};
use elgato_streamdeck::asynchronous::AsyncStreamDeck;
use elgato_streamdeck::info::Kind;
use hidapi::HidApi;
use image::{DynamicImage, RgbaImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Discover the attached panel. Exactly one must be present; anything else
/// is fatal and maps to its own exit code in `main`.
pub fn discover() -> Result<(HidApi, Kind, String)> {
    let hid = elgato_streamdeck::new_hidapi().map_err(|e| DeckError::Hid(e.to_string()))?;

    let mut devices = elgato_streamdeck::list_devices(&hid);
    match devices.len() {
        0 => Err(DeckError::NoDevice),
        1 => {
            let (kind, serial) = devices.remove(0);
            info!("found Stream Deck {kind:?} (serial: {serial})");
            Ok((hid, kind, serial))
        }
        n => Err(DeckError::MultipleDevices(n)),
    }
}

/// Exclusive owner of the one panel for the life of the process.
///
/// Every mutating device call goes through `gate`, so the metric sampler,
/// the key dispatcher and the main control flow never interleave writes.
/// `open` flips to false exactly once, at shutdown; pushes after that fail.
#[derive(Clone)]
pub struct DeviceSession {
    pub(crate) deck: Arc<AsyncStreamDeck>,
    kind: Kind,
    vendor_id: u16,
    product_id: u16,
    gate: Arc<Mutex<()>>,
    open: Arc<AtomicBool>,
}

impl DeviceSession {
    /// Open the panel found by [`discover`].
    pub fn open(hid: &HidApi, kind: Kind, serial: &str) -> Result<Self> {
        let deck = AsyncStreamDeck::connect(hid, kind, serial)
            .map_err(|e| DeckError::Device(e.to_string()))?;

        let (vendor_id, product_id) = hid
            .device_list()
            .find(|d| d.serial_number() == Some(serial))
            .map(|d| (d.vendor_id(), d.product_id()))
            .unwrap_or((0, 0));

        Ok(Self {
            deck: Arc::new(deck),
            kind,
            vendor_id,
            product_id,
            gate: Arc::new(Mutex::new(())),
            open: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Native key face resolution for this panel.
    pub fn key_size(&self) -> u32 {
        self.kind.key_image_format().size.0 as u32
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Log the identity block: model, vendor/product ids, serial, firmware.
    pub async fn log_identity(&self) -> Result<()> {
        let serial = self
            .deck
            .serial_number()
            .await
            .map_err(|e| DeckError::Device(e.to_string()))?;
        let firmware = self
            .deck
            .firmware_version()
            .await
            .map_err(|e| DeckError::Device(e.to_string()))?;

        info!(
            "{} found: vendor 0x{:04x}, product 0x{:04x}, serial {}, firmware {}",
            model_label(self.kind),
            self.vendor_id,
            self.product_id,
            serial,
            firmware
        );
        Ok(())
    }

    /// Push a raw RGBA key image (must be `key_size` squared).
    pub async fn set_key_image(&self, key: u8, rgba: Vec<u8>) -> Result<()> {
        let size = self.key_size();
        let image = RgbaImage::from_raw(size, size, rgba)
            .ok_or_else(|| DeckError::Render("key image buffer has wrong size".into()))?;

        let _guard = self.gate.lock().await;
        if !self.is_open() {
            return Err(DeckError::Device("device is closed".into()));
        }
        self.deck
            .set_button_image(key, DynamicImage::ImageRgba8(image))
            .await
            .map_err(|e| DeckError::Device(e.to_string()))?;
        self.deck
            .flush()
            .await
            .map_err(|e| DeckError::Device(e.to_string()))
    }

    /// Blank all key faces.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.gate.lock().await;
        self.deck
            .reset()
            .await
            .map_err(|e| DeckError::Device(e.to_string()))
    }

    pub async fn set_brightness(&self, percent: u8) -> Result<()> {
        let _guard = self.gate.lock().await;
        self.deck
            .set_brightness(percent)
            .await
            .map_err(|e| DeckError::Device(e.to_string()))
    }

    /// Mark the session closed. Pushes fail from here on; the HID handle is
    /// released when the last clone drops.
    pub async fn close(&self) {
        let _guard = self.gate.lock().await;
        self.open.store(false, Ordering::SeqCst);
    }
}

impl crate::metrics::MetricTarget for DeviceSession {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn push_metric(&self, key: u8, value: f32, label: &str) -> Result<()> {
        let image = crate::render::render_metric(value, label, self.key_size())?;
        self.set_key_image(key, image).await
    }
}

/// Human-readable model label, with a generic fallback for kinds this build
/// doesn't know by name.
fn model_label(kind: Kind) -> &'static str {
    match kind {
        Kind::Original => "Stream Deck Original",
        Kind::OriginalV2 => "Stream Deck Original V2",
        Kind::Mini => "Stream Deck Mini",
        Kind::MiniMk2 => "Stream Deck Mini MK2",
        Kind::Xl => "Stream Deck XL",
        Kind::XlV2 => "Stream Deck XL V2",
        Kind::Mk2 => "Stream Deck MK2",
        Kind::Pedal => "Stream Deck Pedal",
        Kind::Plus => "Stream Deck Plus",
        Kind::Neo => "Stream Deck Neo",
        _ => "Stream Deck",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_have_specific_labels() {
        assert_eq!(model_label(Kind::Mk2), "Stream Deck MK2");
        assert_eq!(model_label(Kind::Xl), "Stream Deck XL");
    }
}
