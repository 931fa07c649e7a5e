// Datafile operations over the card filesystem.
// Every operation reopens volume → root → file; the logger sleeps minutes
// between appends, so handles never stay open across calls. DataFile
// bundles the three handles for multi-step read sessions.
// Names are FAT 8.3 short names.

use embedded_sdmmc::{
    BlockDevice, Directory, File, Mode, TimeSource, Volume, VolumeIdx, VolumeManager,
};
use log::info;

// datafile lines end CRLF, matching the desktop tools that read the card
pub const LINE_END: &str = "\r\n";

pub struct DataStore<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    pub volume_mgr: VolumeManager<D, T>,
}

impl<D, T> DataStore<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    pub fn new(device: D, time_source: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(device, time_source),
        }
    }
}

/// An open datafile plus the volume and directory handles behind it.
/// Field order closes the file before the directory and volume on drop.
pub struct DataFile<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    file: File<'a, D, T, 4, 4, 1>,
    root: Directory<'a, D, T, 4, 4, 1>,
    volume: Volume<'a, D, T, 4, 4, 1>,
}

fn open_data_file<'a, D, T>(
    store: &'a DataStore<D, T>,
    name: &str,
    mode: Mode,
) -> Result<DataFile<'a, D, T>, &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    let volume = store
        .volume_mgr
        .open_volume(VolumeIdx(0))
        .map_err(|_| "open volume failed")?;
    let root = volume.open_root_dir().map_err(|_| "open root dir failed")?;
    let file = root
        .open_file_in_dir(name, mode)
        .map_err(|_| "open file failed")?;

    Ok(DataFile { file, root, volume })
}

/// Open an existing datafile at offset zero for reading.
pub fn open_for_read<'a, D, T>(
    store: &'a DataStore<D, T>,
    name: &str,
) -> Result<DataFile<'a, D, T>, &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    open_data_file(store, name, Mode::ReadOnly)
}

/// Open a datafile positioned at its end, creating it if absent.
pub fn open_for_append<'a, D, T>(
    store: &'a DataStore<D, T>,
    name: &str,
) -> Result<DataFile<'a, D, T>, &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    open_data_file(store, name, Mode::ReadWriteCreateOrAppend)
}

impl<D, T> DataFile<'_, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    /// Read from the current position until `buf` is full or the file ends.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, &'static str> {
        let mut total = 0;
        while !self.file.is_eof() && total < buf.len() {
            let n = self
                .file
                .read(&mut buf[total..])
                .map_err(|_| "read failed")?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    pub fn write(&self, data: &[u8]) -> Result<(), &'static str> {
        self.file.write(data).map_err(|_| "write failed")
    }

    /// Write `line`, terminate it with [`LINE_END`], and flush so the data
    /// survives a power cut before the next operation.
    pub fn write_line(&self, line: &str) -> Result<(), &'static str> {
        self.file
            .write(line.as_bytes())
            .map_err(|_| "write failed")?;
        self.file
            .write(LINE_END.as_bytes())
            .map_err(|_| "write failed")?;
        self.file.flush().map_err(|_| "flush failed")
    }

    pub fn seek_to(&self, offset: u32) -> Result<(), &'static str> {
        self.file.seek_from_start(offset).map_err(|_| "seek failed")
    }

    /// Current read/write position in bytes from the start of the file.
    pub fn position(&self) -> u32 {
        self.file.offset()
    }

    pub fn size(&self) -> u32 {
        self.file.length()
    }

    pub fn at_end(&self) -> bool {
        self.file.is_eof()
    }

    /// Close file, directory, and volume, surfacing any close error.
    /// Dropping the handle closes everything too, but silently.
    pub fn close(self) -> Result<(), &'static str> {
        let DataFile { file, root, volume } = self;
        file.close().map_err(|_| "close file failed")?;
        root.close().map_err(|_| "close dir failed")?;
        volume.close().map_err(|_| "close volume failed")
    }
}

// one-shot operations

pub fn exists<D, T>(store: &DataStore<D, T>, name: &str) -> bool
where
    D: BlockDevice,
    T: TimeSource,
{
    let Ok(volume) = store.volume_mgr.open_volume(VolumeIdx(0)) else {
        return false;
    };
    let Ok(root) = volume.open_root_dir() else {
        return false;
    };
    root.find_directory_entry(name).is_ok()
}

/// Create `name` and write the header lines, one per line, if the file
/// does not already exist. Returns whether the file was created.
pub fn create_with_header<D, T>(
    store: &DataStore<D, T>,
    name: &str,
    header_lines: &[&str],
) -> Result<bool, &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    if exists(store, name) {
        // already exists; keep whatever is on the card
        return Ok(false);
    }

    info!("storage: creating {}", name);
    let file = open_for_append(store, name)?;
    for line in header_lines {
        file.write_line(line)?;
        info!("storage: {}", line);
    }
    file.close()?;
    Ok(true)
}

/// Append one CRLF-terminated line to `name`, creating the file if absent.
pub fn append_line<D, T>(store: &DataStore<D, T>, name: &str, line: &str) -> Result<(), &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    let file = open_for_append(store, name)?;
    file.write_line(line)?;
    file.close()
}

/// Read up to `buf.len()` bytes starting at `offset`.
pub fn read_bytes_at<D, T>(
    store: &DataStore<D, T>,
    name: &str,
    offset: u32,
    buf: &mut [u8],
) -> Result<usize, &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    let file = open_for_read(store, name)?;
    file.seek_to(offset)?;
    file.read(buf)
}

/// Size in bytes; Err if the file does not exist.
pub fn file_size<D, T>(store: &DataStore<D, T>, name: &str) -> Result<u32, &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    let file = open_for_read(store, name)?;
    Ok(file.size())
}

// delete a datafile; no-op if absent
pub fn remove<D, T>(store: &DataStore<D, T>, name: &str) -> Result<(), &'static str>
where
    D: BlockDevice,
    T: TimeSource,
{
    let volume = store
        .volume_mgr
        .open_volume(VolumeIdx(0))
        .map_err(|_| "open volume failed")?;
    let root = volume.open_root_dir().map_err(|_| "open root dir failed")?;
    let _ = root.delete_entry_in_dir(name);
    Ok(())
}
