#![allow(missing_docs)] // Don't require docs for test code
//! A simulated MC56F8013 behind the [`JtagAccess`] trait, for tests and dry runs.
//!
//! The simulation covers what the driver relies on: the JTAG status capture,
//! the EOnCE command protocol, the instructions the driver lets the core
//! execute, both memories, the bridge registers, the flash module and the
//! flashing stub while the core runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::architecture::dsp5680xx::instruction::CoreInstruction;
use crate::architecture::dsp5680xx::once::{
    JtagStatus, OnceCommand, OnceRegister, TapInstruction, MASTER_FLASH_ERASE,
};
use crate::flashing::hfm::{register, HfmCommand, Ustat, CLKDIV_LOADED};
use crate::flashing::signature::data_signature;
use crate::flashing::stubs::FLASH_PROGRAMMER;

use super::{DebugProbeError, JtagAccess, TapSelection};

const FLASH_WORDS: usize = 0x2000;
const HFM_BASE: u32 = 0xF400;
const HFM_REGISTERS: u32 = 0x20;
const OBASE: u8 = 0xFF;
const BRIDGE_LOW: u32 = 0xFF_FFFE;
const BRIDGE_HIGH: u32 = 0xFF_FFFF;
const STUB_ADDRESS: u32 = 0x8700;
const ADDRESS_MASK: u32 = 0xFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Running,
    Debug,
}

/// What the next data register shift means to the EOnCE module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Command,
    Read(OnceRegister),
    Write(OnceRegister),
    Instruction { go: bool },
}

#[derive(Debug, Default)]
struct Registers {
    r0: u32,
    r2: u32,
    r3: u32,
    r4: u32,
    y0: u16,
    y1: u16,
    pc: u32,
}

#[derive(Debug, Default)]
struct Bridge {
    otx: u16,
    otx1: u16,
    orx: u16,
    orx1: u16,
    /// ORX1 holds a word the core has not picked up yet.
    rx_full: bool,
}

#[derive(Debug)]
struct Hfm {
    clkdiv: u16,
    cnfg: u16,
    ustat: u16,
    prot: u16,
    protb: u16,
    cmd: u16,
    data: u16,
    /// Address and data of the last write into the flash array.
    latch: Option<(u32, u16)>,
    busy_reads: u32,
    busy_remaining: u32,
}

impl Default for Hfm {
    fn default() -> Self {
        Hfm {
            clkdiv: 0,
            cnfg: 0,
            ustat: Ustat::START | Ustat::COMPLETE,
            prot: 0,
            protb: 0,
            cmd: 0,
            data: 0,
            latch: None,
            busy_reads: 0,
            busy_remaining: 0,
        }
    }
}

#[derive(Debug)]
struct Simulation {
    tap: TapSelection,
    ir: Option<TapInstruction>,
    master_ir: u32,
    mode: Mode,
    status_script: VecDeque<JtagStatus>,
    dead: bool,
    refuse_debug: bool,
    hold_debug: bool,
    secured: bool,
    pending: Pending,
    opdbr: Vec<u16>,
    registers: Registers,
    bridge: Bridge,
    hfm: Hfm,
    x: HashMap<u32, u16>,
    p: HashMap<u32, u16>,
    flash: Vec<u16>,
    stub_running: bool,
    queue: Vec<(u32, u32)>,
    max_queue_depth: usize,
    scans: usize,
    hfm_commands: Vec<HfmCommand>,
    sim_writes: Vec<u16>,
}

impl Default for Simulation {
    fn default() -> Self {
        Simulation {
            tap: TapSelection::Core,
            ir: None,
            master_ir: 0,
            mode: Mode::Running,
            status_script: VecDeque::new(),
            dead: false,
            refuse_debug: false,
            hold_debug: false,
            secured: false,
            pending: Pending::Command,
            opdbr: Vec::new(),
            registers: Registers::default(),
            bridge: Bridge::default(),
            hfm: Hfm::default(),
            x: HashMap::new(),
            p: HashMap::new(),
            flash: vec![0xFFFF; FLASH_WORDS],
            stub_running: false,
            queue: Vec::new(),
            max_queue_depth: 0,
            scans: 0,
            hfm_commands: Vec::new(),
            sim_writes: Vec::new(),
        }
    }
}

impl Simulation {
    fn jtag_status(&self) -> JtagStatus {
        match self.mode {
            Mode::Running => JtagStatus::Normal,
            Mode::Debug => JtagStatus::Debug,
        }
    }

    fn osr(&self) -> u8 {
        match self.mode {
            Mode::Running => 0x00,
            Mode::Debug => 0x30,
        }
    }

    fn run_queue(&mut self) {
        for (data, length) in std::mem::take(&mut self.queue) {
            self.shift_dr(data, length);
        }
    }

    fn shift_ir(&mut self, instruction: u32) -> u32 {
        self.scans += 1;

        if self.tap == TapSelection::Master {
            self.master_ir = instruction;
            return 0x01;
        }

        let status = if self.dead {
            JtagStatus::Dead
        } else {
            self.status_script
                .pop_front()
                .unwrap_or_else(|| self.jtag_status())
        };

        self.ir = TapInstruction::from_code(instruction);
        if self.ir == Some(TapInstruction::DebugRequest) && !self.refuse_debug {
            self.mode = Mode::Debug;
            self.stub_running = false;
            self.pending = Pending::Command;
            self.opdbr.clear();
        }

        status.code().into()
    }

    fn shift_dr(&mut self, data: u32, length: u32) -> u32 {
        self.scans += 1;

        if self.tap == TapSelection::Master {
            if self.master_ir == MASTER_FLASH_ERASE && length == 8 {
                self.flash.fill(0xFFFF);
                self.secured = false;
                self.refuse_debug = false;
                self.hfm_commands.push(HfmCommand::MassErase);
            }
            return 0;
        }

        if self.ir != Some(TapInstruction::EnableOnce) {
            return 0;
        }

        match std::mem::replace(&mut self.pending, Pending::Command) {
            Pending::Command => {
                let status = self.osr();
                self.command(OnceCommand(data as u8));
                status.into()
            }
            Pending::Read(register) => self.read_once_register(register).into(),
            Pending::Write(register) => {
                self.write_once_register(register, data as u16);
                0
            }
            Pending::Instruction { go } => {
                self.opdbr.push(data as u16);
                if go {
                    let words = std::mem::take(&mut self.opdbr);
                    self.execute(&words);
                }
                0
            }
        }
    }

    fn command(&mut self, command: OnceCommand) {
        let Some(register) = command.register() else {
            return;
        };

        if register == OnceRegister::None {
            if command.ex() {
                self.exit_debug_mode();
            }
            return;
        }

        self.pending = match (register, command.rw()) {
            (OnceRegister::Opdbr, false) => Pending::Instruction { go: command.go() },
            (register, true) => Pending::Read(register),
            (register, false) => Pending::Write(register),
        };
    }

    fn read_once_register(&mut self, register: OnceRegister) -> u16 {
        match register {
            OnceRegister::Osr => self.osr().into(),
            OnceRegister::Obase => OBASE.into(),
            OnceRegister::Otx => self.bridge.otx,
            OnceRegister::Otx1 => self.bridge.otx1,
            _ => 0,
        }
    }

    fn write_once_register(&mut self, register: OnceRegister, data: u16) {
        match register {
            OnceRegister::Orx => self.bridge.orx = data,
            OnceRegister::Orx1 => {
                self.bridge.orx1 = data;
                self.bridge.rx_full = true;
                if self.stub_running {
                    self.stub_step();
                }
            }
            _ => {}
        }
    }

    fn exit_debug_mode(&mut self) {
        if self.mode != Mode::Debug || self.hold_debug {
            return;
        }
        self.mode = Mode::Running;

        let stub_loaded = FLASH_PROGRAMMER
            .code
            .iter()
            .enumerate()
            .all(|(offset, word)| self.read_p(STUB_ADDRESS + offset as u32) == *word);
        if self.registers.pc == STUB_ADDRESS && stub_loaded {
            self.stub_running = true;
            self.stub_step();
        }
    }

    /// The flashing stub programs the received word at `p:(r3)+`.
    fn stub_step(&mut self) {
        if !self.bridge.rx_full {
            return;
        }
        self.bridge.rx_full = false;

        let address = self.registers.r3;
        self.registers.r3 = (address + 1) & ADDRESS_MASK;
        self.hfm.latch = Some((address, self.bridge.orx1));
        self.hfm.cmd = HfmCommand::WordProgram.code();
        self.start_command();
    }

    fn execute(&mut self, words: &[u16]) {
        if self.mode != Mode::Debug {
            return;
        }

        let instruction = CoreInstruction::from_opcode(words[0])
            .unwrap_or_else(|| panic!("the fake target cannot execute {words:04X?}"));
        assert_eq!(
            words.len(),
            instruction.encoding().operand.word_count(),
            "malformed {}",
            instruction.encoding().mnemonic
        );

        let operand = |index: usize| words.get(index).copied().unwrap_or(0);
        let long = (u32::from(operand(1)) | (u32::from(operand(2)) << 16)) & ADDRESS_MASK;
        let increment = |register: u32| (register + 1) & ADDRESS_MASK;

        let r = &self.registers;
        let (r0, r2, r3) = (r.r0, r.r2, r.r3);

        match instruction {
            CoreInstruction::MoveLongToR0 => self.registers.r0 = long,
            CoreInstruction::MoveLongToR2 => self.registers.r2 = long,
            CoreInstruction::MoveLongToR3 => self.registers.r3 = long,
            CoreInstruction::MoveLongToY => {
                self.registers.y0 = operand(1);
                self.registers.y1 = operand(2);
            }
            CoreInstruction::MoveLongToPc => self.registers.pc = long,
            CoreInstruction::MoveXR0ToY0 => self.registers.y0 = self.read_x(r0),
            CoreInstruction::MoveXR0ToY1 => self.registers.y1 = self.read_x(r0),
            CoreInstruction::MoveXR0IncToY0 => {
                self.registers.y0 = self.read_x(r0);
                self.registers.r0 = increment(r0);
            }
            CoreInstruction::MovePR0IncToY0 => {
                self.registers.y0 = self.read_p(r0);
                self.registers.r0 = increment(r0);
            }
            CoreInstruction::MovePR0IncToY1 => {
                self.registers.y1 = self.read_p(r0);
                self.registers.r0 = increment(r0);
            }
            CoreInstruction::MoveXR2ToY0 => self.registers.y0 = self.read_x(r2),
            CoreInstruction::MoveXR2DispToY0 => {
                self.registers.y0 = self.read_x(r2 + u32::from(operand(1)));
            }
            CoreInstruction::MoveY0ToXR0 => self.write_x(r0, self.registers.y0),
            CoreInstruction::MoveY0ToXR0Inc => {
                self.write_x(r0, self.registers.y0);
                self.registers.r0 = increment(r0);
            }
            CoreInstruction::MoveY0ToPR0Inc => {
                self.write_p(r0, self.registers.y0);
                self.registers.r0 = increment(r0);
            }
            CoreInstruction::MoveY0ToXR3 => self.write_x(r3, self.registers.y0),
            CoreInstruction::MoveY0ToPR3Inc => {
                self.write_p(r3, self.registers.y0);
                self.registers.r3 = increment(r3);
            }
            CoreInstruction::MoveY1ToXR0 => self.write_x(r0, self.registers.y1),
            CoreInstruction::MoveY1ToXR0Inc => {
                self.write_x(r0, self.registers.y1);
                self.registers.r0 = increment(r0);
            }
            CoreInstruction::MoveY1ToPR0Inc => {
                self.write_p(r0, self.registers.y1);
                self.registers.r0 = increment(r0);
            }
            CoreInstruction::MoveImmToY0 => self.registers.y0 = operand(1),
            CoreInstruction::MoveImmToXR0 => self.write_x(r0, operand(1)),
            CoreInstruction::MoveImmToXR2 => self.write_x(r2, operand(1)),
            CoreInstruction::MoveImmToXR2Disp => {
                self.write_x(r2 + u32::from(operand(2)), operand(1));
            }
            CoreInstruction::MovePcToR4 => self.registers.r4 = self.registers.pc,
            CoreInstruction::MoveR4ToY => {
                self.registers.y0 = self.registers.r4 as u16;
                self.registers.y1 = (self.registers.r4 >> 16) as u16;
            }
        }
    }

    fn read_x(&mut self, address: u32) -> u16 {
        match address {
            BRIDGE_LOW => self.bridge.orx,
            BRIDGE_HIGH => {
                self.bridge.rx_full = false;
                self.bridge.orx1
            }
            _ if (HFM_BASE..HFM_BASE + HFM_REGISTERS).contains(&address) => {
                self.read_hfm((address - HFM_BASE) as u16)
            }
            _ => self.x.get(&address).copied().unwrap_or(0),
        }
    }

    fn write_x(&mut self, address: u32, value: u16) {
        match address {
            BRIDGE_LOW => self.bridge.otx = value,
            // A secured device does not let the core talk to the host.
            BRIDGE_HIGH if self.secured => {}
            BRIDGE_HIGH => self.bridge.otx1 = value,
            _ if (HFM_BASE..HFM_BASE + HFM_REGISTERS).contains(&address) => {
                self.write_hfm((address - HFM_BASE) as u16, value)
            }
            _ => {
                if address == 0xF140 {
                    self.sim_writes.push(value);
                }
                self.x.insert(address, value);
            }
        }
    }

    fn read_p(&self, address: u32) -> u16 {
        match self.flash.get(address as usize) {
            Some(word) => *word,
            None => self.p.get(&address).copied().unwrap_or(0),
        }
    }

    fn write_p(&mut self, address: u32, value: u16) {
        if (address as usize) < self.flash.len() {
            self.hfm.latch = Some((address, value));
        } else {
            self.p.insert(address, value);
        }
    }

    fn read_hfm(&mut self, offset: u16) -> u16 {
        match offset {
            register::CLKDIV => self.hfm.clkdiv,
            register::CNFG => self.hfm.cnfg,
            register::PROT => self.hfm.prot,
            register::PROTB => self.hfm.protb,
            register::USTAT if self.hfm.busy_remaining > 0 => {
                self.hfm.busy_remaining -= 1;
                self.hfm.ustat & !(Ustat::COMPLETE | Ustat::START)
            }
            register::USTAT => self.hfm.ustat,
            register::CMD => self.hfm.cmd,
            register::DATA => self.hfm.data,
            _ => 0,
        }
    }

    fn write_hfm(&mut self, offset: u16, value: u16) {
        match offset {
            register::CLKDIV => self.hfm.clkdiv = CLKDIV_LOADED | (value & 0x7F),
            register::CNFG => self.hfm.cnfg = value,
            register::PROT => self.hfm.prot = value,
            register::PROTB => self.hfm.protb = value,
            register::CMD => self.hfm.cmd = value,
            register::USTAT => {
                let clear = value & (Ustat::PVIOL | Ustat::ACCERR | Ustat::BLANK);
                if clear.count_ones() > 1 {
                    self.hfm.ustat |= Ustat::ACCERR;
                } else {
                    self.hfm.ustat &= !clear;
                }
                if value & Ustat::START != 0 {
                    self.start_command();
                }
            }
            _ => {}
        }
    }

    fn start_command(&mut self) {
        let command = HfmCommand::from_code(self.hfm.cmd);
        let latch = self.hfm.latch.take();
        self.hfm.ustat |= Ustat::START | Ustat::COMPLETE;
        self.hfm.busy_remaining = self.hfm.busy_reads;

        let (Some(command), Some((address, data)), true) =
            (command, latch, self.hfm.clkdiv & CLKDIV_LOADED != 0)
        else {
            self.hfm.ustat |= Ustat::ACCERR;
            return;
        };

        match command {
            HfmCommand::EraseVerify => {
                if self.flash.iter().all(|word| *word == 0xFFFF) {
                    self.hfm.ustat |= Ustat::BLANK;
                } else {
                    self.hfm.ustat &= !Ustat::BLANK;
                }
            }
            HfmCommand::MassErase => self.flash.fill(0xFFFF),
            HfmCommand::CalculateDataSignature => {
                let start = (address as usize).min(self.flash.len());
                let end = (start + usize::from(data)).min(self.flash.len());
                self.hfm.data = data_signature(&self.flash[start..end]);
            }
            HfmCommand::WordProgram => match self.flash.get_mut(address as usize) {
                Some(word) => *word &= data,
                None => self.hfm.ustat |= Ustat::ACCERR,
            },
        }

        self.hfm_commands.push(command);
    }
}

/// A simulated MC56F8013.
///
/// Clones share the simulated target, so a test can keep one to inspect the
/// target after handing the other to a session.
#[derive(Debug, Clone, Default)]
pub struct FakeDsp {
    simulation: Arc<Mutex<Simulation>>,
}

impl FakeDsp {
    /// A running, unsecured target with blank flash.
    pub fn new() -> Self {
        Self::default()
    }

    fn simulation(&self) -> MutexGuard<'_, Simulation> {
        self.simulation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Put the core in debug mode, as if it had hit a breakpoint.
    pub fn break_into_debug(&self) {
        self.simulation().mode = Mode::Debug;
    }

    pub fn is_running(&self) -> bool {
        self.simulation().mode == Mode::Running
    }

    /// JTAG statuses captured by the next IR scans, before the real status is reported again.
    pub fn script_jtag_status(&self, statuses: impl IntoIterator<Item = JtagStatus>) {
        self.simulation().status_script.extend(statuses);
    }

    /// Make every IR scan capture all ones.
    pub fn set_link_dead(&self, dead: bool) {
        self.simulation().dead = dead;
    }

    /// Ignore debug requests, as a secured device does.
    pub fn refuse_debug_mode(&self, refuse: bool) {
        self.simulation().refuse_debug = refuse;
    }

    /// Ignore exit requests, keeping the core in debug mode.
    pub fn hold_in_debug_mode(&self, hold: bool) {
        self.simulation().hold_debug = hold;
    }

    pub fn set_secured(&self, secured: bool) {
        self.simulation().secured = secured;
    }

    pub fn select_tap(&self, tap: TapSelection) {
        self.simulation().tap = tap;
    }

    /// Keep the flash module busy for `reads` USTAT reads after each command start.
    pub fn set_flash_busy_reads(&self, reads: u32) {
        self.simulation().hfm.busy_reads = reads;
    }

    pub fn set_pc(&self, pc: u32) {
        self.simulation().registers.pc = pc;
    }

    pub fn pc(&self) -> u32 {
        self.simulation().registers.pc
    }

    /// Overwrite flash contents without going through the flash module.
    pub fn load_flash(&self, address: u32, words: &[u16]) {
        let mut simulation = self.simulation();
        let start = address as usize;
        simulation.flash[start..start + words.len()].copy_from_slice(words);
    }

    pub fn flash(&self, address: u32, words: usize) -> Vec<u16> {
        let simulation = self.simulation();
        let start = address as usize;
        simulation.flash[start..start + words].to_vec()
    }

    pub fn program_word(&self, address: u32) -> u16 {
        self.simulation().read_p(address)
    }

    pub fn data_word(&self, address: u32) -> u16 {
        self.simulation().x.get(&address).copied().unwrap_or(0)
    }

    pub fn set_data_word(&self, address: u32, value: u16) {
        self.simulation().x.insert(address, value);
    }

    /// Flash module commands executed so far, in order.
    pub fn hfm_commands(&self) -> Vec<HfmCommand> {
        self.simulation().hfm_commands.clone()
    }

    /// Values written to the SIM control register of the MC56F8013.
    pub fn sim_writes(&self) -> Vec<u16> {
        self.simulation().sim_writes.clone()
    }

    /// Number of IR and DR scans performed so far.
    pub fn scan_count(&self) -> usize {
        self.simulation().scans
    }

    /// Largest number of DR scans queued at once.
    pub fn max_queue_depth(&self) -> usize {
        self.simulation().max_queue_depth
    }
}

impl JtagAccess for FakeDsp {
    fn shift_ir(&mut self, instruction: u32, _length: u32) -> Result<u32, DebugProbeError> {
        let mut simulation = self.simulation();
        simulation.run_queue();
        Ok(simulation.shift_ir(instruction))
    }

    fn shift_dr(&mut self, data: u32, length: u32) -> Result<u32, DebugProbeError> {
        let mut simulation = self.simulation();
        simulation.run_queue();
        Ok(simulation.shift_dr(data, length))
    }

    fn schedule_shift_dr(&mut self, data: u32, length: u32) -> Result<(), DebugProbeError> {
        let mut simulation = self.simulation();
        simulation.queue.push((data, length));
        simulation.max_queue_depth = simulation.max_queue_depth.max(simulation.queue.len());
        Ok(())
    }

    fn execute(&mut self) -> Result<(), DebugProbeError> {
        self.simulation().run_queue();
        Ok(())
    }

    fn active_tap(&self) -> TapSelection {
        self.simulation().tap
    }
}
