use std::cell::RefCell;
use std::rc::Rc;

use super::cop0::{self, EPC, SR};
use super::irq::IrqLine;
use super::{Cpu, RESET_PC};
use crate::bus::{Bus, Ram};
use crate::settings::{BreakMode, CpuSettings};
use crate::signal::FrameSignal;

/// Where the test programs are loaded
const BASE: u32 = 0x8000_1000;

fn i_type(op: u32, rs: u32, rt: u32, imm: u16) -> u32 {
    (op << 26) | (rs << 21) | (rt << 16) | imm as u32
}

fn r_type(funct: u32, rs: u32, rt: u32, rd: u32) -> u32 {
    (rs << 21) | (rt << 16) | (rd << 11) | funct
}

fn addiu(rt: u32, rs: u32, imm: i16) -> u32 {
    i_type(0x09, rs, rt, imm as u16)
}

fn beq(rs: u32, rt: u32, offset: i16) -> u32 {
    i_type(0x04, rs, rt, offset as u16)
}

fn j(target: u32) -> u32 {
    (0x02 << 26) | ((target >> 2) & 0x3ff_ffff)
}

fn lw(rt: u32, base: u32, offset: i16) -> u32 {
    i_type(0x23, base, rt, offset as u16)
}

fn sw(rt: u32, base: u32, offset: i16) -> u32 {
    i_type(0x2b, base, rt, offset as u16)
}

fn mtc0(rt: u32, rd: u32) -> u32 {
    0x4080_0000 | (rt << 16) | (rd << 11)
}

const NOP: u32 = 0;
const SYSCALL: u32 = 0x0000_000c;
const RFE: u32 = 0x4200_0010;

fn load_program(ram: &mut Ram, addr: u32, program: &[u32]) {
    for (i, &w) in program.iter().enumerate() {
        ram.write_word(addr + (i as u32) * 4, w);
    }
}

/// Build a CPU ready to execute `program` at `BASE` with exceptions vectored to RAM
fn setup(program: &[u32]) -> (Cpu, Ram) {
    let mut ram = Ram::new();

    load_program(&mut ram, BASE, program);

    let mut cpu = Cpu::new(CpuSettings::default());

    cpu.reset();
    cpu.cop0.set_reg(SR, 0);
    cpu.set_pc(BASE);

    (cpu, ram)
}

fn exception_code(cpu: &Cpu) -> u32 {
    (cpu.cop0.cause() & cop0::CAUSE_EXC) >> 2
}

#[test]
fn store_sum_from_reset() {
    let mut ram = Ram::new();

    load_program(
        &mut ram,
        RESET_PC,
        &[
            addiu(1, 0, 5),
            addiu(2, 0, 7),
            r_type(0x20, 1, 2, 3),
            sw(3, 0, 0),
        ],
    );

    let mut cpu = Cpu::new(CpuSettings::default());

    cpu.reset();

    assert_eq!(cpu.run(&mut ram, 4), 4);
    assert_eq!(ram.read_word(0), 12);
    assert_eq!(cpu.pc(), RESET_PC + 16);
}

#[test]
fn empty_budget_runs_nothing() {
    let (mut cpu, mut ram) = setup(&[addiu(1, 0, 5)]);

    assert_eq!(cpu.run(&mut ram, 0), 0);
    assert_eq!(cpu.pc(), BASE);
}

#[test]
fn branch_delay_slot() {
    let (mut cpu, mut ram) = setup(&[
        beq(0, 0, 2),
        // Delay slot
        addiu(1, 0, 1),
        // Skipped
        addiu(2, 0, 2),
        // Target
        addiu(3, 0, 3),
    ]);

    cpu.run(&mut ram, 3);

    assert_eq!(cpu.regs[1], 1);
    assert_eq!(cpu.regs[2], 0);
    assert_eq!(cpu.regs[3], 3);
    assert_eq!(cpu.pc(), BASE + 16);
}

#[test]
fn back_to_back_loads() {
    let (mut cpu, mut ram) = setup(&[lw(1, 0, 0), lw(2, 0, 4)]);

    ram.write_word(0, 0x11);
    ram.write_word(4, 0x22);

    cpu.run(&mut ram, 2);

    assert_eq!(cpu.regs[1], 0x11);
    assert_eq!(cpu.regs[2], 0x22);
}

#[test]
fn load_in_branch_delay_slot() {
    let (mut cpu, mut ram) = setup(&[
        j(BASE + 16),
        lw(1, 0, 0),
        NOP,
        NOP,
        // The load hasn't landed yet
        r_type(0x21, 1, 0, 2),
        r_type(0x21, 1, 0, 3),
    ]);

    ram.write_word(0, 0x11);

    cpu.run(&mut ram, 4);

    assert_eq!(cpu.regs[1], 0x11);
    assert_eq!(cpu.regs[2], 0);
    assert_eq!(cpu.regs[3], 0x11);
    assert_eq!(cpu.pc(), BASE + 24);
}

#[test]
fn add_overflow_traps() {
    let (mut cpu, mut ram) = setup(&[r_type(0x20, 1, 2, 3)]);

    cpu.regs[1] = 0x7fff_ffff;
    cpu.regs[2] = 1;
    cpu.regs[3] = 0xdead;

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.regs[3], 0xdead);
    assert_eq!(exception_code(&cpu), 0xc);
    assert_eq!(cpu.cop0.reg(EPC), BASE);
    assert_eq!(cpu.pc(), 0x8000_0080);
}

#[test]
fn sub_overflow_traps() {
    let (mut cpu, mut ram) = setup(&[r_type(0x22, 1, 2, 3)]);

    cpu.regs[1] = 0x8000_0000;
    cpu.regs[2] = 1;

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.regs[3], 0);
    assert_eq!(exception_code(&cpu), 0xc);
}

#[test]
fn unsigned_arithmetic_wraps() {
    let (mut cpu, mut ram) = setup(&[r_type(0x21, 1, 2, 3), r_type(0x23, 2, 1, 4)]);

    cpu.regs[1] = 0x7fff_ffff;
    cpu.regs[2] = 1;

    cpu.run(&mut ram, 2);

    assert_eq!(cpu.regs[3], 0x8000_0000);
    assert_eq!(cpu.regs[4], 0x8000_0002);
    assert_eq!(cpu.pc(), BASE + 8);
}

#[test]
fn divide_by_zero() {
    let (mut cpu, mut ram) = setup(&[r_type(0x1a, 1, 2, 0)]);

    cpu.regs[1] = 10;
    cpu.hi = 0x1234;
    cpu.lo = 0x5678;

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.hi(), 0x1234);
    assert_eq!(cpu.lo(), 0x5678);
    assert_eq!(cpu.pc(), BASE + 4);
}

#[test]
fn divide_min_by_minus_one() {
    let (mut cpu, mut ram) = setup(&[r_type(0x1a, 1, 2, 0)]);

    cpu.regs[1] = 0x8000_0000;
    cpu.regs[2] = 0xffff_ffff;

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.lo(), 0x8000_0000);
    assert_eq!(cpu.hi(), 0);
}

#[test]
fn multiply_signed() {
    let (mut cpu, mut ram) = setup(&[r_type(0x18, 1, 2, 0), r_type(0x12, 0, 0, 3)]);

    cpu.regs[1] = (-3i32) as u32;
    cpu.regs[2] = 0x4000_0000;

    cpu.run(&mut ram, 2);

    assert_eq!(cpu.hi(), 0xffff_ffff);
    assert_eq!(cpu.lo(), 0x4000_0000);
    assert_eq!(cpu.regs[3], 0x4000_0000);
}

#[test]
fn exception_vectors() {
    let (mut cpu, mut ram) = setup(&[SYSCALL]);

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.pc(), 0x8000_0080);
    assert_eq!(exception_code(&cpu), 8);

    let (mut cpu, mut ram) = setup(&[SYSCALL]);

    cpu.cop0.set_reg(SR, cop0::SR_BEV);
    cpu.run(&mut ram, 1);

    assert_eq!(cpu.pc(), 0xbfc0_0180);
}

#[test]
fn exception_in_delay_slot() {
    let (mut cpu, mut ram) = setup(&[beq(0, 0, 4), SYSCALL]);

    cpu.run(&mut ram, 2);

    assert_eq!(cpu.cop0.reg(EPC), BASE);
    assert!(cpu.cop0.cause() & cop0::CAUSE_BD != 0);
    assert_eq!(exception_code(&cpu), 8);
    assert_eq!(cpu.pc(), 0x8000_0080);

    // The branch is forgotten
    assert_eq!(cpu.delay_reg(), 0);
}

#[test]
fn illegal_instructions() {
    // JR with a non-zero rd field
    let (mut cpu, mut ram) = setup(&[r_type(0x08, 1, 0, 1)]);

    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 0xa);

    // Opcode 0x13 (COP3)
    let (mut cpu, mut ram) = setup(&[0x4c00_0000]);

    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 0xa);
}

#[test]
fn interrupt_on_sr_write() {
    // IEc and IM for line 2
    let (mut cpu, mut ram) = setup(&[mtc0(1, 12), NOP]);

    cpu.regs[1] = 0x1001;

    assert!(!cpu.set_irq_line(IrqLine::Irq2, true).is_active());
    assert_eq!(cpu.pc(), BASE);

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.pc(), 0x8000_0080);
    assert_eq!(exception_code(&cpu), 0);
    // The MTC0 completed before the interrupt
    assert_eq!(cpu.cop0.reg(EPC), BASE + 4);
    assert_eq!(cpu.cop0.sr() & 0x3f, 0b00_0100);
}

#[test]
fn interrupt_on_line_assert() {
    let (mut cpu, _) = setup(&[]);

    cpu.cop0.set_reg(SR, 0x0400 | cop0::SR_IEC);

    assert!(cpu.set_irq_line(IrqLine::Irq0, true).is_active());
    assert_eq!(cpu.pc(), 0x8000_0080);
    assert_eq!(cpu.cop0.reg(EPC), BASE);
    assert!(cpu.cop0.cause() & 0x400 != 0);

    assert!(!cpu.set_irq_line(IrqLine::Irq0, false).is_active());
    assert!(cpu.cop0.cause() & 0x400 == 0);
}

#[test]
fn irq_callback() {
    let (mut cpu, _) = setup(&[]);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();

    cpu.set_irq_callback(Some(Box::new(move |line| log.borrow_mut().push(line))));

    let _ = cpu.set_irq_line(IrqLine::Irq3, true);
    let _ = cpu.set_irq_line(IrqLine::Irq3, false);
    let _ = cpu.set_irq_line(IrqLine::Irq5, true);

    assert_eq!(*seen.borrow(), vec![IrqLine::Irq3, IrqLine::Irq5]);
}

#[test]
fn return_from_exception() {
    let (mut cpu, mut ram) = setup(&[RFE]);

    cpu.cop0.set_reg(SR, 0x14);

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.cop0.sr() & 0x3f, 0x15);
    assert_eq!(cpu.pc(), BASE + 4);
}

#[test]
fn interrupt_after_rfe() {
    let (mut cpu, mut ram) = setup(&[RFE, NOP]);

    // IM for line 0, interrupts only enabled in the previous mode
    cpu.cop0.set_reg(SR, 0x0400 | cop0::SR_IEP);

    assert!(!cpu.set_irq_line(IrqLine::Irq0, true).is_active());

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.pc(), 0x8000_0080);
    assert_eq!(exception_code(&cpu), 0);
    assert_eq!(cpu.cop0.reg(EPC), BASE + 4);
    assert_eq!(cpu.cop0.sr() & 0x3f, 0b00_0100);
}

#[test]
fn coprocessor_unusable() {
    // MFC2 with CU2 clear
    let (mut cpu, mut ram) = setup(&[0x4801_0000]);

    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 0xb);
    assert_eq!((cpu.cop0.cause() >> 28) & 3, 2);

    // COP0 in user mode with CU0 clear. The code has to live in KUSEG.
    let mut ram = Ram::new();

    load_program(&mut ram, 0x2000, &[mtc0(1, 12)]);

    let mut cpu = Cpu::new(CpuSettings::default());

    cpu.reset();
    cpu.cop0.set_reg(SR, cop0::SR_KUC);
    cpu.set_pc(0x2000);
    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 0xb);
    assert_eq!((cpu.cop0.cause() >> 28) & 3, 0);
}

#[test]
fn mtc0_write_masks() {
    let (mut cpu, mut ram) = setup(&[mtc0(1, 13), mtc0(1, 15)]);

    cpu.regs[1] = 0xffff_ffff;

    cpu.run(&mut ram, 2);

    assert_eq!(cpu.cop0.cause(), 0x300);
    assert_eq!(cpu.cop0.reg(cop0::PRID), 0x200);
    assert_eq!(cpu.pc(), BASE + 8);
}

#[test]
fn unaligned_loads() {
    let (mut cpu, mut ram) = setup(&[
        // LWR r1, 0x101(r0)
        i_type(0x26, 0, 1, 0x101),
        // LWL r1, 0x104(r0)
        i_type(0x22, 0, 1, 0x104),
    ]);

    ram.write_word(0x100, 0x4433_2211);
    ram.write_word(0x104, 0x8877_6655);

    cpu.regs[1] = 0xaabb_ccdd;

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.regs[1], 0xaa44_3322);

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.regs[1], 0x5544_3322);
}

#[test]
fn unaligned_stores() {
    let (mut cpu, mut ram) = setup(&[
        // SWR r2, 0x201(r0)
        i_type(0x2e, 0, 2, 0x201),
        // SWL r2, 0x204(r0)
        i_type(0x2a, 0, 2, 0x204),
    ]);

    cpu.regs[2] = 0x1234_5678;

    cpu.run(&mut ram, 2);

    assert_eq!(ram.read_word(0x200), 0x3456_7800);
    assert_eq!(ram.read_word(0x204), 0x0000_0012);
}

#[test]
fn reverse_endian_access() {
    let mut ram = Ram::new();

    load_program(
        &mut ram,
        0x2000,
        &[
            // LB r1, 0x300(r0)
            i_type(0x20, 0, 1, 0x300),
            // LH r2, 0x300(r0)
            i_type(0x21, 0, 2, 0x300),
            // LWL r3, 0x300(r0)
            i_type(0x22, 0, 3, 0x300),
            // LWR r4, 0x301(r0)
            i_type(0x26, 0, 4, 0x301),
            // LWL r5, 0x302(r0)
            i_type(0x22, 0, 5, 0x302),
            // SWL r6, 0x311(r0)
            i_type(0x2a, 0, 6, 0x311),
            // SWR r6, 0x317(r0)
            i_type(0x2e, 0, 6, 0x317),
        ],
    );

    ram.write_word(0x300, 0x4433_2211);
    ram.write_word(0x310, 0x8877_6655);
    ram.write_word(0x314, 0x8877_6655);

    let mut cpu = Cpu::new(CpuSettings::default());

    cpu.reset();
    cpu.cop0.set_reg(SR, cop0::SR_RE | cop0::SR_KUC);
    cpu.set_pc(0x2000);
    cpu.regs[4] = 0xaabb_ccdd;
    cpu.regs[5] = 0xaabb_ccdd;
    cpu.regs[6] = 0x1122_3344;
    cpu.run(&mut ram, 7);

    assert_eq!(cpu.regs[1], 0x44);
    assert_eq!(cpu.regs[2], 0x4433);
    // The unaligned loads and stores take the bytes from the other end of the word
    assert_eq!(cpu.regs[3], 0x4400_0000);
    assert_eq!(cpu.regs[4], 0xaa33_2211);
    assert_eq!(cpu.regs[5], 0x4433_22dd);
    assert_eq!(ram.read_word(0x310), 0x1122_6655);
    assert_eq!(ram.read_word(0x314), 0x8877_6644);
}

#[test]
fn load_address_error() {
    // LH r1, 1(r0)
    let (mut cpu, mut ram) = setup(&[i_type(0x21, 0, 1, 1)]);

    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 4);
    assert_eq!(cpu.cop0.reg(cop0::BADVADDR), 1);
}

#[test]
fn user_mode_store_to_kernel_space() {
    let mut ram = Ram::new();

    // SB r0, 0(r1)
    load_program(&mut ram, 0x2000, &[i_type(0x28, 1, 0, 0)]);

    let mut cpu = Cpu::new(CpuSettings::default());

    cpu.reset();
    cpu.cop0.set_reg(SR, cop0::SR_KUC);
    cpu.set_pc(0x2000);
    cpu.regs[1] = 0x8000_0000;
    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 5);
    assert_eq!(cpu.cop0.reg(cop0::BADVADDR), 0x8000_0000);
}

#[test]
fn isolated_cache_drops_stores() {
    let (mut cpu, mut ram) = setup(&[sw(1, 0, 0x10), i_type(0x20, 0, 2, 0x10)]);

    cpu.cop0.set_reg(SR, cop0::SR_ISC);
    cpu.regs[1] = 0x1234;

    // The SW is silently dropped, the LB stops the slice
    assert_eq!(cpu.run(&mut ram, 10), 2);
    assert!(cpu.stopped());
    assert_eq!(ram.read_word(0x10), 0);
    assert_eq!(cpu.pc(), BASE + 8);
}

#[test]
fn unsupported_stops_slice() {
    // MFC1 with CU1 set
    let (mut cpu, mut ram) = setup(&[0x4400_0000, NOP, NOP]);

    cpu.cop0.set_reg(SR, 1 << 29);

    assert_eq!(cpu.run(&mut ram, 10), 1);
    assert!(cpu.stopped());
    assert_eq!(cpu.pc(), BASE + 4);

    let mut settings = CpuSettings::default();
    settings.stop_on_unsupported = false;
    cpu.set_settings(settings);

    cpu.set_pc(BASE);

    assert_eq!(cpu.run(&mut ram, 3), 3);
    assert!(!cpu.stopped());
}

#[test]
fn break_modes() {
    let (mut cpu, mut ram) = setup(&[0x0000_000d, NOP]);

    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 9);

    let (mut cpu, mut ram) = setup(&[0x0000_000d, NOP]);

    cpu.set_settings(CpuSettings {
        break_mode: BreakMode::Halt,
        ..CpuSettings::default()
    });

    assert_eq!(cpu.run(&mut ram, 5), 1);
    assert!(cpu.stopped());
    assert_eq!(cpu.pc(), BASE);
}

#[test]
fn link_registers() {
    let (mut cpu, mut ram) = setup(&[
        // BLTZAL r1, +4: not taken but still links
        i_type(0x01, 1, 0x10, 4),
        // JALR r2, r3
        r_type(0x09, 3, 0, 2),
        NOP,
    ]);

    cpu.regs[1] = 1;
    cpu.regs[3] = BASE + 0x40;

    cpu.run(&mut ram, 3);

    assert_eq!(cpu.regs[31], BASE + 8);
    assert_eq!(cpu.regs[2], BASE + 12);
    assert_eq!(cpu.pc(), BASE + 0x40);
}

#[test]
fn misaligned_jump_target() {
    let (mut cpu, mut ram) = setup(&[r_type(0x08, 1, 0, 0)]);

    cpu.regs[1] = BASE + 2;

    cpu.run(&mut ram, 1);

    assert_eq!(exception_code(&cpu), 4);
    assert_eq!(cpu.cop0.reg(cop0::BADVADDR), BASE + 2);
}

#[test]
fn prev_pc_skips_delay_slot_nop() {
    let (mut cpu, mut ram) = setup(&[beq(0, 0, 1), NOP, addiu(1, 0, 1)]);

    cpu.run(&mut ram, 2);

    assert_eq!(cpu.prev_pc(), BASE);

    cpu.run(&mut ram, 1);

    assert_eq!(cpu.prev_pc(), BASE + 8);
}

#[test]
fn gte_moves() {
    let (mut cpu, mut ram) = setup(&[
        // MTC2 r1, $15 (SXYP)
        0x4881_7800,
        // CTC2 r1, $26 (H)
        0x48c1_d000,
        // MFC2 r2, $12 (SXY0)
        0x4802_6000,
        // CFC2 r3, $26
        0x4843_d000,
    ]);

    cpu.cop0.set_reg(SR, 1 << 30);
    cpu.regs[1] = 0x0010_0020;

    cpu.run(&mut ram, 4);

    assert_eq!(cpu.gte().data(14), 0x0010_0020);
    assert_eq!(cpu.regs[2], 0);
    assert_eq!(cpu.regs[3], 0x0010_0020);
}

#[test]
fn gte_memory_transfers() {
    let (mut cpu, mut ram) = setup(&[
        // LWC2 $9, 0x40(r0)
        i_type(0x32, 0, 9, 0x40),
        // SWC2 $9, 0x44(r0)
        i_type(0x3a, 0, 9, 0x44),
        // LWC2 $9, 0x42(r0): misaligned
        i_type(0x32, 0, 9, 0x42),
    ]);

    cpu.cop0.set_reg(SR, 1 << 30);
    ram.write_word(0x40, 0x0000_8001);

    cpu.run(&mut ram, 3);

    // IR1 reads back sign-extended
    assert_eq!(ram.read_word(0x44), 0xffff_8001);
    assert_eq!(exception_code(&cpu), 4);
    assert_eq!(cpu.cop0.reg(cop0::BADVADDR), 0x42);
}

/// Bus that pokes the `FrameSignal` when a word is written to 0x100
struct SignalingBus {
    ram: Ram,
    signal: FrameSignal,
    iop_calls: Vec<(u32, u16)>,
}

impl Bus for SignalingBus {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.ram.read_byte(addr)
    }

    fn read_half(&mut self, addr: u32) -> u16 {
        self.ram.read_half(addr)
    }

    fn read_word(&mut self, addr: u32) -> u32 {
        self.ram.read_word(addr)
    }

    fn write_byte(&mut self, addr: u32, v: u8) {
        self.ram.write_byte(addr, v)
    }

    fn write_half(&mut self, addr: u32, v: u16) {
        self.ram.write_half(addr, v)
    }

    fn write_word(&mut self, addr: u32, v: u32) {
        match addr {
            0x100 => self.signal.shorten_frame(),
            0x104 => self.signal.set_irq_line(IrqLine::Irq1, v != 0),
            _ => self.ram.write_word(addr, v),
        }
    }

    fn iop_call(&mut self, pc: u32, code: u16, regs: &mut [u32; 32]) {
        self.iop_calls.push((pc, code));
        regs[2] = 0xabcd;
        regs[0] = 0xffff;
    }
}

fn signaling_setup(program: &[u32]) -> (Cpu, SignalingBus) {
    let (cpu, ram) = setup(program);

    let bus = SignalingBus {
        ram,
        signal: cpu.frame_signal(),
        iop_calls: Vec::new(),
    };

    (cpu, bus)
}

#[test]
fn frame_signal_shortens_slice() {
    let (mut cpu, mut bus) = signaling_setup(&[NOP, sw(0, 0, 0x100), NOP, NOP]);

    assert_eq!(cpu.run(&mut bus, 10), 2);
    assert_eq!(cpu.pc(), BASE + 8);
    assert!(!cpu.stopped());
}

#[test]
fn frame_signal_raises_interrupt() {
    let (mut cpu, mut bus) = signaling_setup(&[addiu(1, 0, 1), sw(1, 0, 0x104), NOP]);

    cpu.cop0.set_reg(SR, 0x0800 | cop0::SR_IEC);

    cpu.run(&mut bus, 2);

    assert_eq!(cpu.pc(), 0x8000_0080);
    assert_eq!(cpu.cop0.reg(EPC), BASE + 8);
    assert!(cpu.cop0.cause() & 0x800 != 0);
}

#[test]
fn iop_call_hook() {
    let (mut cpu, mut bus) = signaling_setup(&[addiu(0, 0, 0x1234)]);

    cpu.run(&mut bus, 1);

    assert_eq!(bus.iop_calls, vec![(BASE, 0x1234)]);
    assert_eq!(cpu.regs[2], 0xabcd);
    assert_eq!(cpu.regs[0], 0);
    assert_eq!(cpu.pc(), BASE + 4);
}

#[test]
fn reset_state() {
    let (mut cpu, mut ram) = setup(&[SYSCALL]);

    cpu.cop0.set_reg(SR, cop0::SR_KUC | cop0::SR_IEC | cop0::SR_ISC);
    cpu.run(&mut ram, 1);

    cpu.reset();

    assert_eq!(cpu.pc(), RESET_PC);
    assert_eq!(cpu.prev_pc(), 0xffff_ffff);
    // The mode stack pushed by the SYSCALL survives the reset
    assert_eq!(
        cpu.cop0.sr(),
        cop0::SR_BEV | cop0::SR_ISC | cop0::SR_IEP | cop0::SR_KUP
    );
    assert_eq!(cpu.cop0.reg(cop0::PRID), 0x200);
    assert_eq!(cpu.cop0.reg(cop0::RANDOM), 63);
    // CAUSE keeps its value across resets
    assert_eq!(exception_code(&cpu), 8);
}
