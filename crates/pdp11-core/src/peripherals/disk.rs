//! RK11 disk controller driving a single RK05 pack image.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::api::{Device, DeviceContext};
use crate::{MachineError, TrapCause};

/// Disk interrupt vector.
pub const DISK_VECTOR: u8 = 0o220;
/// Disk bus request level.
pub const DISK_PRIORITY: u8 = 5;

const CYLINDERS: u16 = 203;
const SURFACES: u16 = 2;
const SECTORS: u16 = 12;
const SECTOR_WORDS: usize = 256;
const SECTOR_BYTES: usize = SECTOR_WORDS * 2;
/// Size of a full RK05 pack image in bytes.
pub const DISK_BYTES: u64 =
    CYLINDERS as u64 * SURFACES as u64 * SECTORS as u64 * SECTOR_BYTES as u64;

const RKDS: u32 = 0o777_400;
const RKER: u32 = 0o777_402;
const RKCS: u32 = 0o777_404;
const RKWC: u32 = 0o777_406;
const RKBA: u32 = 0o777_410;
const RKDA: u32 = 0o777_412;

const CS_GO: u16 = 0o1;
const CS_EXTENDED_ADDRESS: u16 = 0o60;
const CS_INTERRUPT_ENABLE: u16 = 0o100;
const CS_READY: u16 = 0o200;
const CS_SEARCH_COMPLETE: u16 = 0o20_000;
const CS_HARD_ERROR: u16 = 0o40_000;
const CS_ERROR: u16 = 0o100_000;
const CS_READ_ONLY: u16 = 0o170_200;

const DS_READY: u16 = 0o100;
const DS_POWER_ON: u16 = 0o4_700;

const ER_DRIVE_ERROR: u16 = 0o100_000;
const ER_OVERRUN: u16 = 0o40_000;
const ER_NON_EXISTENT_MEMORY: u16 = 0o2_000;
const ER_NON_EXISTENT_DRIVE: u16 = 0o200;
const ER_NON_EXISTENT_CYLINDER: u16 = 0o100;
const ER_NON_EXISTENT_SECTOR: u16 = 0o40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    ControlReset,
    Write,
    Read,
    WriteCheck,
    Seek,
    ReadCheck,
    DriveReset,
    WriteLock,
}

impl Function {
    const fn from_csr(csr: u16) -> Self {
        match (csr >> 1) & 7 {
            0 => Self::ControlReset,
            1 => Self::Write,
            2 => Self::Read,
            3 => Self::WriteCheck,
            4 => Self::Seek,
            5 => Self::ReadCheck,
            6 => Self::DriveReset,
            _ => Self::WriteLock,
        }
    }
}

/// RK11 controller with a single RK05 drive backed by `S`.
///
/// A transfer moves one sector per step; the controller stays busy until
/// the word count reaches zero.
#[derive(Debug)]
pub struct Disk<S> {
    storage: S,
    rkds: u16,
    rker: u16,
    rkcs: u16,
    rkwc: u16,
    rkba: u16,
    drive: u16,
    cylinder: u16,
    surface: u16,
    sector: u16,
}

impl<S: Read + Write + Seek> Disk<S> {
    /// Controller attached to a pack image.
    #[must_use]
    pub fn new(storage: S) -> Self {
        let mut disk = Self {
            storage,
            rkds: 0,
            rker: 0,
            rkcs: 0,
            rkwc: 0,
            rkba: 0,
            drive: 0,
            cylinder: 0,
            surface: 0,
            sector: 0,
        };
        disk.clear_registers();
        disk
    }

    /// Pack image.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Detaches the pack image.
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn clear_registers(&mut self) {
        self.rkds = DS_POWER_ON;
        self.rker = 0;
        self.rkcs = CS_READY;
        self.rkwc = 0;
        self.rkba = 0;
        self.drive = 0;
        self.cylinder = 0;
        self.surface = 0;
        self.sector = 0;
    }

    const fn disk_address(&self) -> u16 {
        (self.drive << 13) | (self.cylinder << 5) | (self.surface << 4) | self.sector
    }

    fn set_disk_address(&mut self, value: u16) {
        self.drive = value >> 13;
        self.cylinder = (value >> 5) & 0o377;
        self.surface = (value >> 4) & 1;
        self.sector = value & 0o17;
    }

    fn bus_address(&self) -> u32 {
        (u32::from(self.rkcs & CS_EXTENDED_ADDRESS) << 12) | u32::from(self.rkba)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_bus_address(&mut self, address: u32) {
        self.rkba = address as u16;
        let extended = (address >> 12) as u16 & CS_EXTENDED_ADDRESS;
        self.rkcs = (self.rkcs & !CS_EXTENDED_ADDRESS) | extended;
    }

    fn busy(&mut self) {
        self.rkds &= !DS_READY;
        self.rkcs &= !CS_READY;
    }

    fn complete(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MachineError> {
        self.rkds |= DS_READY;
        self.rkcs = (self.rkcs | CS_READY) & !CS_GO;
        if self.rkcs & CS_INTERRUPT_ENABLE != 0 {
            ctx.interrupt(DISK_VECTOR, DISK_PRIORITY)?;
        }
        Ok(())
    }

    fn fail(&mut self, ctx: &mut DeviceContext<'_>, error: u16) -> Result<(), MachineError> {
        log::warn!("rk11: error {error:06o} at disk address {:06o}", self.disk_address());
        self.rker |= error;
        self.rkcs |= CS_ERROR | CS_HARD_ERROR;
        self.complete(ctx)
    }

    fn position(&self) -> u64 {
        let track = u64::from(self.cylinder) * u64::from(SURFACES) + u64::from(self.surface);
        let sector = track * u64::from(SECTORS) + u64::from(self.sector);
        sector * SECTOR_BYTES as u64
    }

    fn read_sector(&mut self, buffer: &mut [u8; SECTOR_BYTES]) -> io::Result<()> {
        self.storage.seek(SeekFrom::Start(self.position()))?;
        let mut filled = 0;
        while filled < SECTOR_BYTES {
            match self.storage.read(&mut buffer[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        buffer[filled..].fill(0);
        Ok(())
    }

    fn write_sector(&mut self, buffer: &[u8; SECTOR_BYTES]) -> io::Result<()> {
        self.storage.seek(SeekFrom::Start(self.position()))?;
        self.storage.write_all(buffer)?;
        self.storage.flush()
    }

    fn advance_sector(&mut self) {
        self.sector += 1;
        if self.sector < SECTORS {
            return;
        }
        self.sector = 0;
        self.surface += 1;
        if self.surface < SURFACES {
            return;
        }
        self.surface = 0;
        self.cylinder += 1;
        if self.cylinder >= CYLINDERS {
            self.rker |= ER_OVERRUN;
        }
    }

    fn transfer(
        &mut self,
        ctx: &mut DeviceContext<'_>,
        function: Function,
    ) -> Result<(), MachineError> {
        if self.rkwc == 0 {
            return self.complete(ctx);
        }
        let mut buffer = [0_u8; SECTOR_BYTES];
        if function != Function::Write {
            if let Err(err) = self.read_sector(&mut buffer) {
                log::error!("rk11: read failed: {err}");
                return self.fail(ctx, ER_DRIVE_ERROR);
            }
        }
        log::debug!(
            "rk11: {function:?} cyl {:03o} surf {} sect {:02o} ba {:06o} wc {:06o}",
            self.cylinder,
            self.surface,
            self.sector,
            self.bus_address(),
            self.rkwc
        );
        let mut address = self.bus_address();
        let mut words = 0;
        while words < SECTOR_WORDS && self.rkwc != 0 {
            let bytes = &mut buffer[words * 2..words * 2 + 2];
            let moved = match function {
                Function::Write => ctx
                    .memory
                    .read16(address)
                    .map(|word| bytes.copy_from_slice(&word.to_le_bytes())),
                Function::Read => {
                    ctx.memory.write16(address, u16::from_le_bytes([bytes[0], bytes[1]]))
                }
                _ => Ok(()),
            };
            if moved.is_err() {
                self.set_bus_address(address);
                return self.fail(ctx, ER_NON_EXISTENT_MEMORY);
            }
            address = (address + 2) & 0o777_777;
            self.rkwc = self.rkwc.wrapping_add(1);
            words += 1;
        }
        self.set_bus_address(address);
        if function == Function::Write {
            if let Err(err) = self.write_sector(&buffer) {
                log::error!("rk11: write failed: {err}");
                return self.fail(ctx, ER_DRIVE_ERROR);
            }
        }
        self.advance_sector();
        Ok(())
    }
}

impl<S: Read + Write + Seek> Device for Disk<S> {
    fn name(&self) -> &'static str {
        "rk11"
    }

    fn read16(&mut self, addr: u32) -> Result<u16, TrapCause> {
        Ok(match addr & !1 {
            RKDS => self.rkds,
            RKER => self.rker,
            RKCS => self.rkcs & !CS_GO,
            RKWC => self.rkwc,
            RKBA => self.rkba,
            RKDA => self.disk_address(),
            _ => 0,
        })
    }

    fn write16(&mut self, addr: u32, value: u16) -> Result<(), TrapCause> {
        match addr & !1 {
            RKCS => {
                self.rkcs = (value & !CS_READ_ONLY) | (self.rkcs & CS_READ_ONLY);
                if value & CS_GO != 0 {
                    log::debug!("rk11: go {:?}", Function::from_csr(value));
                }
            }
            RKWC => self.rkwc = value,
            RKBA => self.rkba = value,
            RKDA => self.set_disk_address(value),
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.clear_registers();
    }

    fn step(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MachineError> {
        if self.rkcs & CS_GO == 0 {
            return Ok(());
        }
        let function = Function::from_csr(self.rkcs);
        match function {
            Function::ControlReset => {
                self.clear_registers();
                Ok(())
            }
            Function::Write | Function::Read | Function::WriteCheck => {
                if self.drive != 0 {
                    return self.fail(ctx, ER_NON_EXISTENT_DRIVE);
                }
                if self.cylinder >= CYLINDERS {
                    return self.fail(ctx, ER_NON_EXISTENT_CYLINDER);
                }
                if self.sector >= SECTORS {
                    return self.fail(ctx, ER_NON_EXISTENT_SECTOR);
                }
                self.busy();
                self.transfer(ctx, function)
            }
            Function::Seek | Function::DriveReset => {
                if function == Function::DriveReset {
                    self.rker = 0;
                }
                self.rkcs &= !CS_SEARCH_COMPLETE;
                self.complete(ctx)
            }
            Function::ReadCheck | Function::WriteLock => self.complete(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{Disk, DISK_VECTOR};
    use crate::api::{Device, DeviceContext};
    use crate::interrupt::InterruptController;
    use crate::memory::MemoryImage;

    const RKCS: u32 = 0o777_404;
    const RKWC: u32 = 0o777_406;
    const RKBA: u32 = 0o777_410;
    const RKDA: u32 = 0o777_412;
    const RKER: u32 = 0o777_402;

    fn pack() -> Cursor<Vec<u8>> {
        let mut image = vec![0_u8; 4 * 512];
        for (i, byte) in image.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        Cursor::new(image)
    }

    fn run(
        disk: &mut Disk<Cursor<Vec<u8>>>,
        memory: &mut MemoryImage,
        interrupts: &mut InterruptController,
        steps: usize,
    ) {
        for _ in 0..steps {
            let mut ctx = DeviceContext {
                memory: &mut *memory,
                interrupts: &mut *interrupts,
            };
            disk.step(&mut ctx).unwrap();
        }
    }

    #[test]
    fn read_moves_one_sector_per_step_then_completes() {
        let mut disk = Disk::new(pack());
        let mut memory = MemoryImage::new();
        let mut interrupts = InterruptController::new();
        disk.write16(RKDA, 1).unwrap();
        disk.write16(RKBA, 0o10_000).unwrap();
        disk.write16(RKWC, 0u16.wrapping_sub(300)).unwrap();
        disk.write16(RKCS, 0o105).unwrap();

        run(&mut disk, &mut memory, &mut interrupts, 1);
        assert_eq!(disk.read16(RKCS).unwrap() & 0o200, 0);
        assert_eq!(memory.read8(0o10_000), Ok((512 % 251) as u8));
        run(&mut disk, &mut memory, &mut interrupts, 2);

        assert_eq!(disk.read16(RKWC), Ok(0));
        assert_eq!(disk.read16(RKBA), Ok(0o10_000 + 600));
        assert_eq!(disk.read16(RKDA), Ok(3));
        assert_eq!(disk.read16(RKCS).unwrap() & 0o201, 0o200);
        assert_eq!(interrupts.pending().map(|r| r.vector), Some(DISK_VECTOR));
    }

    #[test]
    fn write_then_read_round_trips_through_the_pack() {
        let mut disk = Disk::new(Cursor::new(Vec::new()));
        let mut memory = MemoryImage::new();
        let mut interrupts = InterruptController::new();
        memory.write16(0o2000, 0o123_456).unwrap();
        disk.write16(RKDA, 0o40).unwrap();
        disk.write16(RKBA, 0o2000).unwrap();
        disk.write16(RKWC, 0o177_777).unwrap();
        disk.write16(RKCS, 0o3).unwrap();
        run(&mut disk, &mut memory, &mut interrupts, 2);
        assert_eq!(disk.storage().get_ref().len(), 24 * 512 + 512);
        assert_eq!(&disk.storage().get_ref()[24 * 512..24 * 512 + 2], &0o123_456_u16.to_le_bytes());
    }

    #[test]
    fn nonexistent_drive_reports_error() {
        let mut disk = Disk::new(pack());
        let mut memory = MemoryImage::new();
        let mut interrupts = InterruptController::new();
        disk.write16(RKDA, 0o20_000).unwrap();
        disk.write16(RKWC, 0o177_000).unwrap();
        disk.write16(RKCS, 0o5).unwrap();
        run(&mut disk, &mut memory, &mut interrupts, 1);
        assert_eq!(disk.read16(RKER).unwrap() & 0o200, 0o200);
        assert_eq!(disk.read16(RKCS).unwrap() & 0o100_200, 0o100_200);
    }
}
