// SD card over SPI with FAT volume manager.
// The RTC that names the datafiles also stamps FAT directory entries.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_sdmmc::SdCard;
use log::info;

use crate::clock::{Clock, FatClock};
use crate::storage::DataStore;

/// A [`DataStore`] backed by an SD card, timestamped from the deployment RTC.
pub type CardStore<SPI, D, C> = DataStore<SdCard<SPI, D>, FatClock<C>>;

pub struct SdStorage<SPI, D, C>
where
    SPI: SpiDevice,
    D: DelayNs,
    C: Clock,
{
    pub store: CardStore<SPI, D, C>,
}

impl<SPI, D, C> SdStorage<SPI, D, C>
where
    SPI: SpiDevice,
    D: DelayNs,
    C: Clock,
{
    /// Probe the card, then mount it behind a volume manager.
    ///
    /// The size probe drives the SD init command sequence; both arms are
    /// logged. A failed probe does not fail construction — the bring-up
    /// layer decides how often to retry.
    pub fn new(spi: SPI, delay: D, clock: C) -> Self {
        let sdcard = SdCard::new(spi, delay);

        match sdcard.num_bytes() {
            Ok(bytes) => info!("sdcard: {} bytes ({} MB)", bytes, bytes / 1024 / 1024),
            Err(e) => info!("sdcard: probe failed: {:?}", e),
        }

        Self {
            store: DataStore::new(sdcard, FatClock(clock)),
        }
    }

    /// Ask the card for its size again.
    ///
    /// A card that was absent or unresponsive at construction re-runs its
    /// init sequence here, so this doubles as the probe closure for
    /// [`crate::bringup::init_card`] and as a media-presence check.
    pub fn card_size_bytes(&self) -> Result<u64, &'static str> {
        self.store
            .volume_mgr
            .device(|card| card.num_bytes())
            .map_err(|_| "card probe failed")
    }
}
