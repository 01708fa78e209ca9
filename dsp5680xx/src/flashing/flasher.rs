use dsp5680xx_target::FlashProperties;

use crate::architecture::dsp5680xx::instruction::CoreInstruction;
use crate::architecture::dsp5680xx::{Address, Dsp5680xx};
use crate::core::Watchdog;
use crate::probe::TapSelection;

use super::hfm::{register, HfmCommand, Ustat, CLKDIV_LOADED};
use super::signature::data_signature;
use super::stubs::FLASH_PROGRAMMER;
use super::FlashError;

/// Values written through the upper bridge register to detect read protection.
const PROTECTION_PATTERN: [u16; 2] = [0x1234, 0x4321];

/// Flash operations on a halted DSP5680xx core.
///
/// Register accesses to the flash module rely on r0 pointing at the upper
/// bridge register and r2 at the module base.
#[derive(Debug)]
pub struct Flasher<'session> {
    session: &'session mut Dsp5680xx,
}

impl<'session> Flasher<'session> {
    pub(crate) fn new(session: &'session mut Dsp5680xx) -> Self {
        Flasher { session }
    }

    fn properties(&self) -> &FlashProperties {
        &self.session.chip.flash
    }

    fn load_module_base(&mut self) -> Result<(), FlashError> {
        let base = self.properties().module_base;
        self.session
            .interface
            .execute(CoreInstruction::MoveLongToR2, base, 0)?;
        Ok(())
    }

    fn read_module_register(&mut self, register: u16) -> Result<u16, FlashError> {
        let interface = &mut self.session.interface;
        interface.execute(CoreInstruction::MoveXR2DispToY0, 0, register)?;
        interface.run(CoreInstruction::MoveY0ToXR0)?;
        Ok(interface.once().rx_upper()?)
    }

    fn write_module_register(&mut self, register: u16, value: u16) -> Result<(), FlashError> {
        self.session
            .interface
            .execute(CoreInstruction::MoveImmToXR2Disp, value.into(), register)?;
        Ok(())
    }

    fn wait_ready(&mut self) -> Result<Ustat, FlashError> {
        let settings = self.properties().command;
        let mut watchdog = Watchdog::new(self.session.clock.clone(), settings);

        while watchdog.attempt() {
            let ustat = Ustat(self.read_module_register(register::USTAT)?);
            if ustat.ccif() {
                return Ok(ustat);
            }
        }

        if watchdog.timed_out() {
            tracing::error!("Timed out waiting for the flash module");
            return Err(FlashError::Timeout);
        }
        tracing::error!("Flash module not ready after {} status reads", settings.attempts);
        Err(FlashError::NotReady(settings.attempts))
    }

    /// Clear the bank configuration, stale status bits and the protection registers.
    fn prepare_module(&mut self) -> Result<(), FlashError> {
        self.write_module_register(register::CNFG, 0)?;
        // USTAT error bits only clear when written one at a time.
        for bit in [Ustat::BLANK, Ustat::ACCERR, Ustat::PVIOL] {
            self.write_module_register(register::USTAT, bit)?;
        }
        self.write_module_register(register::PROT, 0)?;
        self.write_module_register(register::PROTB, 0)?;
        Ok(())
    }

    /// Run one flash module command. `data` is written to `address` first, which
    /// is how the module learns the target of the command.
    pub fn execute_command(
        &mut self,
        command: HfmCommand,
        address: Address,
        data: u16,
    ) -> Result<Ustat, FlashError> {
        self.session.interface.load_bridge_high_to_r0()?;
        self.load_module_base()?;
        self.wait_ready()?;
        self.prepare_module()?;

        let interface = &mut self.session.interface;
        interface.execute(CoreInstruction::MoveImmToY0, data.into(), 0)?;
        interface.execute(CoreInstruction::MoveLongToR3, address.offset, 0)?;
        if address.is_program() {
            interface.run(CoreInstruction::MoveY0ToPR3Inc)?;
        } else {
            interface.run(CoreInstruction::MoveY0ToXR3)?;
        }

        self.write_module_register(register::CMD, command.code())?;
        self.write_module_register(register::USTAT, Ustat::START)?;

        let ustat = self.wait_ready()?;
        if ustat.failed() {
            tracing::error!("Flash command {:?} at {} failed: {:?}", command, address, ustat);
            return Err(FlashError::CommandFailed {
                command,
                ustat: ustat.0,
            });
        }

        tracing::trace!("Flash command {:?} at {} done: {:?}", command, address, ustat);
        Ok(ustat)
    }

    /// Returns true if the flash is read protected.
    ///
    /// A secured device does not let the core write the bridge registers, so a
    /// pattern written through them does not come back.
    pub fn protect_check(&mut self) -> Result<bool, FlashError> {
        self.session.halt_if_needed()?;

        let interface = &mut self.session.interface;
        interface.load_bridge_high_to_r0()?;

        let mut protected = false;
        for pattern in PROTECTION_PATTERN {
            interface.execute(CoreInstruction::MoveImmToY0, pattern.into(), 0)?;
            interface.run(CoreInstruction::MoveY0ToXR0)?;
            let read_back = interface.once().rx_upper()?;
            protected |= read_back != pattern;
        }

        if protected {
            tracing::warn!("Flash is read protected");
        }
        Ok(protected)
    }

    fn set_clock_divisor(&mut self) -> Result<(), FlashError> {
        let divisor = u16::from(self.properties().clock_divisor);

        self.load_module_base()?;
        self.session.interface.load_bridge_high_to_r0()?;

        let current = self.read_clock_divisor()?;
        if current & 0x7F == divisor {
            tracing::debug!("Flash clock divisor already set to {:#04x}", divisor);
            return Ok(());
        }

        self.session
            .interface
            .execute(CoreInstruction::MoveImmToXR2, divisor.into(), 0)?;

        let current = self.read_clock_divisor()?;
        let expected = CLKDIV_LOADED | divisor;
        if current != expected {
            tracing::error!("Unable to set the flash clock divisor");
            return Err(FlashError::ClockDivisor {
                expected,
                actual: current,
            });
        }

        tracing::debug!("Flash clock divisor set to {:#04x}", divisor);
        Ok(())
    }

    fn read_clock_divisor(&mut self) -> Result<u16, FlashError> {
        let interface = &mut self.session.interface;
        interface.run(CoreInstruction::MoveXR2ToY0)?;
        interface.run(CoreInstruction::MoveY0ToXR0)?;
        Ok(interface.once().rx_upper()?)
    }

    fn flash_start(&self) -> Address {
        Address::program(self.properties().range.start)
    }

    /// Returns true if the whole flash array is blank.
    pub fn erase_check(&mut self) -> Result<bool, FlashError> {
        self.session.halt_if_needed()?;
        if self.protect_check()? {
            return Err(FlashError::Protected);
        }
        self.set_clock_divisor()?;

        let ustat = self.execute_command(HfmCommand::EraseVerify, self.flash_start(), 0)?;
        Ok(ustat.blank())
    }

    /// Mass erase the flash. Returns true if the flash is blank afterwards.
    ///
    /// Only `first == last == 0` is accepted, there is no sector erase.
    pub fn erase(&mut self, first: u32, last: u32) -> Result<bool, FlashError> {
        if first != 0 || last != 0 {
            return Err(FlashError::SectorEraseUnsupported { first, last });
        }

        self.session.halt_if_needed()?;
        self.session.reset_sim()?;
        if self.protect_check()? {
            return Err(FlashError::Protected);
        }
        self.set_clock_divisor()?;

        if self.erase_check()? {
            tracing::info!("Flash is already blank, skipping mass erase");
            return Ok(true);
        }

        self.execute_command(HfmCommand::MassErase, self.flash_start(), 0)?;

        let blank = self.erase_check()?;
        if blank {
            tracing::info!("Flash mass erased");
        } else {
            tracing::warn!("Flash is not blank after mass erase");
        }
        Ok(blank)
    }

    /// Ask the flash module for the signature of `words` words starting at `address`.
    pub fn signature(&mut self, address: u32, words: u32) -> Result<u16, FlashError> {
        let count = u16::try_from(words)
            .ok()
            .filter(|_| self.properties().contains(address, words))
            .ok_or(FlashError::OutOfRange {
                address,
                words: words as usize,
            })?;

        self.session.halt_if_needed()?;
        self.execute_command(
            HfmCommand::CalculateDataSignature,
            Address::program(address),
            count,
        )?;

        let data = Address::data(self.properties().module_base + u32::from(register::DATA));
        Ok(self.session.interface.read_16(data)?)
    }

    /// Program `data` into erased flash at `address` and verify it.
    pub fn program(&mut self, address: u32, data: &[u16]) -> Result<(), FlashError> {
        if data.len() % 2 != 0 {
            return Err(FlashError::OddWordCount(data.len()));
        }
        let words = u32::try_from(data.len())
            .ok()
            .filter(|&words| self.properties().contains(address, words))
            .ok_or(FlashError::OutOfRange {
                address,
                words: data.len(),
            })?;
        let Some((first, rest)) = data.split_first() else {
            return Ok(());
        };

        self.session.halt_if_needed()?;
        if !self.erase_check()? {
            tracing::error!("Flash must be erased before programming");
            return Err(FlashError::NotErased);
        }

        let stub_address = self.properties().stub_address;
        self.session
            .download(Address::program(stub_address), FLASH_PROGRAMMER.code)?;
        self.set_clock_divisor()?;

        self.session
            .interface
            .execute(CoreInstruction::MoveLongToR3, address, 0)?;
        self.session.interface.load_bridge_high_to_r0()?;
        self.load_module_base()?;
        self.prepare_module()?;

        self.session.interface.once().tx_upper(*first)?;
        self.session.resume(Some(stub_address))?;

        let interval = self.properties().stream_flush_interval;
        self.session.interface.batched(|interface| {
            for (index, word) in rest.iter().enumerate() {
                interface.flush_every(index, interval)?;
                interface.once().tx_upper(*word)?;
            }
            Ok(())
        })?;

        let host = data_signature(data);
        let target = self.signature(address, words)?;
        if target != host {
            tracing::error!(
                "Flash signature {:#06x} does not match data signature {:#06x}",
                target,
                host
            );
            return Err(FlashError::SignatureMismatch { target, host });
        }

        tracing::info!("Programmed {} words at P:{:#06x}", data.len(), address);
        Ok(())
    }

    /// Program the security words. The device is secured after the next reset.
    pub fn lock(&mut self) -> Result<(), FlashError> {
        let properties = self.properties();
        let lock_address = properties.lock_address;
        let lock_word = properties.lock_word;

        self.program(lock_address, &[lock_word, lock_word])?;
        tracing::info!("Flash security words programmed, the device is locked after reset");
        Ok(())
    }

    /// Mass erase a secured device through the master TAP.
    pub fn unlock(&mut self) -> Result<(), FlashError> {
        if self.session.interface.once().active_tap() != TapSelection::Master {
            return Err(FlashError::MasterTapRequired);
        }

        let divisor = self.properties().clock_divisor;
        self.session.interface.once().master_flash_erase(divisor)?;
        tracing::info!("Flash mass erased through the master TAP");
        Ok(())
    }
}
