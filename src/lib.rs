// templog: SD-card storage and RTC filename helpers for datalogger deployments.
// clock:   RTC field access trait, FAT timestamp bridge
// stamp:   fixed-width YYMMDDHHmmss filename stems from RTC fields
// sdcard:  SD card over SPI with FAT volume manager
// storage: datafile operations (create-with-header, append, offset reads)
// bringup: power-on chip-select sequencing and retried card init

#![cfg_attr(not(test), no_std)]

pub mod bringup;
pub mod clock;
pub mod sdcard;
pub mod stamp;
pub mod storage;
