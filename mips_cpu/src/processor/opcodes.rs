//! Instruction handlers
//!
//! Every handler ends with exactly one of `advance_pc`, `load`, `delayed_load`,
//! `delayed_branch` or an exception.

use super::cop0::{self, Exception};
use super::instruction::Instruction;
use super::{Psx, RegisterIndex};
use crate::addressable::Addressable;
use crate::bus::{load, store};
use crate::settings::BreakMode;

/// Fetch, decode and execute the instruction at PC
pub(super) fn run_next_instruction(psx: &mut Psx) {
    let pc = psx.cpu.pc;

    let instruction = Instruction(psx.bus.read_word(pc));

    // NOPs in delay slots don't count, that way `prev_pc` keeps pointing at the interesting
    // instruction
    if psx.cpu.delay_reg() == 0 || instruction.0 != 0 {
        psx.cpu.prev_pc = pc;
    }

    psx.cpu.instruction = instruction;

    let handler = OPCODE_HANDLERS[instruction.opcode()];

    handler(psx, instruction);
}

/// Trigger a "coprocessor unusable" exception for coprocessor `n`
fn coprocessor_unusable(psx: &mut Psx, n: u8) {
    psx.cpu.exception(Exception::CoprocessorError);
    psx.cpu.cop0.set_coprocessor_error(n);
}

/// Returns true (and moves on to the next instruction) if the cache is isolated. We don't
/// emulate the caches so the access is dropped.
fn cache_isolated(psx: &mut Psx, what: &str) -> bool {
    if psx.cpu.cop0.cache_isolated() {
        psx.cpu.unsupported(what);
        psx.cpu.advance_pc();
        true
    } else {
        false
    }
}

/// Check that `addr` is accessible in the current mode and aligned to `align + 1`. Raises
/// `error` and returns false otherwise.
fn check_address(psx: &mut Psx, addr: u32, align: u32, error: Exception) -> bool {
    if addr & (psx.cpu.cop0.privilege_mask() | align) != 0 {
        psx.cpu.exception(error);
        psx.cpu.cop0.set_reg(cop0::BADVADDR, addr);
        false
    } else {
        true
    }
}

/// Adjust sub-word addresses when running in reverse endian mode
fn swizzle<T: Addressable>(psx: &Psx, addr: u32) -> u32 {
    if psx.cpu.cop0.reverse_endian() {
        addr ^ T::width().reverse_endian_mask()
    } else {
        addr
    }
}

/// Effective address for loads and stores: base register plus signed offset
fn effective_address(psx: &Psx, instruction: Instruction) -> u32 {
    psx.cpu
        .reg(instruction.s())
        .wrapping_add(instruction.imm_se())
}

/// Target of a relative branch
fn branch_target(psx: &Psx, instruction: Instruction) -> u32 {
    psx.cpu
        .pc
        .wrapping_add(4)
        .wrapping_add(instruction.imm_se() << 2)
}

/// Take the branch if `cond` is true, otherwise move on
fn branch_if(psx: &mut Psx, instruction: Instruction, cond: bool) {
    if cond {
        let target = branch_target(psx, instruction);

        psx.cpu.delayed_branch(target);
    } else {
        psx.cpu.advance_pc();
    }
}

/// When the main opcode is 0 we need to dispatch through a secondary table based on bits [5:0] of
/// the instruction
fn op_function(psx: &mut Psx, instruction: Instruction) {
    let handler = FUNCTION_HANDLERS[instruction.function()];

    handler(psx, instruction);
}

/// Shift Left Logical
fn op_sll(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.t()) << instruction.shift();

    psx.cpu.load(instruction.d(), v);
}

/// Shift Right Logical
fn op_srl(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.t()) >> instruction.shift();

    psx.cpu.load(instruction.d(), v);
}

/// Shift Right Arithmetic
fn op_sra(psx: &mut Psx, instruction: Instruction) {
    let v = (psx.cpu.reg(instruction.t()) as i32) >> instruction.shift();

    psx.cpu.load(instruction.d(), v as u32);
}

/// Shift Left Logical Variable
fn op_sllv(psx: &mut Psx, instruction: Instruction) {
    // Shift amount is truncated to 5 bits
    let shift = psx.cpu.reg(instruction.s()) & 0x1f;
    let v = psx.cpu.reg(instruction.t()) << shift;

    psx.cpu.load(instruction.d(), v);
}

/// Shift Right Logical Variable
fn op_srlv(psx: &mut Psx, instruction: Instruction) {
    let shift = psx.cpu.reg(instruction.s()) & 0x1f;
    let v = psx.cpu.reg(instruction.t()) >> shift;

    psx.cpu.load(instruction.d(), v);
}

/// Shift Right Arithmetic Variable
fn op_srav(psx: &mut Psx, instruction: Instruction) {
    let shift = psx.cpu.reg(instruction.s()) & 0x1f;
    let v = (psx.cpu.reg(instruction.t()) as i32) >> shift;

    psx.cpu.load(instruction.d(), v as u32);
}

/// Jump Register
fn op_jr(psx: &mut Psx, instruction: Instruction) {
    if instruction.d().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    let target = psx.cpu.reg(instruction.s());

    psx.cpu.delayed_branch(target);
}

/// Jump And Link Register
fn op_jalr(psx: &mut Psx, instruction: Instruction) {
    let ra = psx.cpu.pc.wrapping_add(8);
    let target = psx.cpu.reg(instruction.s());

    psx.cpu.delayed_branch(target);

    psx.cpu.set_reg(instruction.d(), ra);
}

/// High-level emulation call, handled by the bus
fn op_hle(psx: &mut Psx, _: Instruction) {
    let pc = psx.cpu.pc;

    match psx.bus.hle_call(pc, &mut psx.cpu.regs) {
        Some(target) => psx.cpu.set_pc(target),
        None => psx.cpu.advance_pc(),
    }

    psx.cpu.regs[0] = 0;
}

/// System Call
fn op_syscall(psx: &mut Psx, _: Instruction) {
    psx.cpu.exception(Exception::SysCall);
}

/// Break
fn op_break(psx: &mut Psx, _: Instruction) {
    match psx.cpu.settings.break_mode {
        BreakMode::Exception => psx.cpu.exception(Exception::Break),
        BreakMode::Halt => {
            info!("BREAK at 0x{:08x}, halting", psx.cpu.pc);
            psx.cpu.stop();
        }
    }
}

/// Move From HI
fn op_mfhi(psx: &mut Psx, instruction: Instruction) {
    let hi = psx.cpu.hi;

    psx.cpu.load(instruction.d(), hi);
}

/// Move To HI
fn op_mthi(psx: &mut Psx, instruction: Instruction) {
    if instruction.d().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    psx.cpu.hi = psx.cpu.reg(instruction.s());
    psx.cpu.advance_pc();
}

/// Move From LO
fn op_mflo(psx: &mut Psx, instruction: Instruction) {
    let lo = psx.cpu.lo;

    psx.cpu.load(instruction.d(), lo);
}

/// Move To LO
fn op_mtlo(psx: &mut Psx, instruction: Instruction) {
    if instruction.d().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    psx.cpu.lo = psx.cpu.reg(instruction.s());
    psx.cpu.advance_pc();
}

/// Multiply (signed)
fn op_mult(psx: &mut Psx, instruction: Instruction) {
    if instruction.d().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    let a = psx.cpu.reg(instruction.s()) as i32 as i64;
    let b = psx.cpu.reg(instruction.t()) as i32 as i64;

    let v = (a * b) as u64;

    psx.cpu.hi = (v >> 32) as u32;
    psx.cpu.lo = v as u32;
    psx.cpu.advance_pc();
}

/// Multiply Unsigned
fn op_multu(psx: &mut Psx, instruction: Instruction) {
    if instruction.d().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    let a = psx.cpu.reg(instruction.s()) as u64;
    let b = psx.cpu.reg(instruction.t()) as u64;

    let v = a * b;

    psx.cpu.hi = (v >> 32) as u32;
    psx.cpu.lo = v as u32;
    psx.cpu.advance_pc();
}

/// Divide (signed)
fn op_div(psx: &mut Psx, instruction: Instruction) {
    if instruction.d().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    let n = psx.cpu.reg(instruction.s()) as i32;
    let d = psx.cpu.reg(instruction.t()) as i32;

    // Division by zero leaves HI and LO untouched
    if d != 0 {
        psx.cpu.hi = n.wrapping_rem(d) as u32;
        psx.cpu.lo = n.wrapping_div(d) as u32;
    }

    psx.cpu.advance_pc();
}

/// Divide Unsigned
fn op_divu(psx: &mut Psx, instruction: Instruction) {
    if instruction.d().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    let n = psx.cpu.reg(instruction.s());
    let d = psx.cpu.reg(instruction.t());

    if d != 0 {
        psx.cpu.hi = n % d;
        psx.cpu.lo = n / d;
    }

    psx.cpu.advance_pc();
}

/// Add and check for signed overflow
fn op_add(psx: &mut Psx, instruction: Instruction) {
    let s = psx.cpu.reg(instruction.s()) as i32;
    let t = psx.cpu.reg(instruction.t()) as i32;

    match s.checked_add(t) {
        Some(v) => psx.cpu.load(instruction.d(), v as u32),
        None => psx.cpu.exception(Exception::Overflow),
    }
}

/// Add Unsigned
fn op_addu(psx: &mut Psx, instruction: Instruction) {
    let v = psx
        .cpu
        .reg(instruction.s())
        .wrapping_add(psx.cpu.reg(instruction.t()));

    psx.cpu.load(instruction.d(), v);
}

/// Subtract and check for signed overflow
fn op_sub(psx: &mut Psx, instruction: Instruction) {
    let s = psx.cpu.reg(instruction.s()) as i32;
    let t = psx.cpu.reg(instruction.t()) as i32;

    match s.checked_sub(t) {
        Some(v) => psx.cpu.load(instruction.d(), v as u32),
        None => psx.cpu.exception(Exception::Overflow),
    }
}

/// Subtract Unsigned
fn op_subu(psx: &mut Psx, instruction: Instruction) {
    let v = psx
        .cpu
        .reg(instruction.s())
        .wrapping_sub(psx.cpu.reg(instruction.t()));

    psx.cpu.load(instruction.d(), v);
}

/// Bitwise And
fn op_and(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) & psx.cpu.reg(instruction.t());

    psx.cpu.load(instruction.d(), v);
}

/// Bitwise Or
fn op_or(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) | psx.cpu.reg(instruction.t());

    psx.cpu.load(instruction.d(), v);
}

/// Bitwise Exclusive Or
fn op_xor(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) ^ psx.cpu.reg(instruction.t());

    psx.cpu.load(instruction.d(), v);
}

/// Bitwise Not Or
fn op_nor(psx: &mut Psx, instruction: Instruction) {
    let v = !(psx.cpu.reg(instruction.s()) | psx.cpu.reg(instruction.t()));

    psx.cpu.load(instruction.d(), v);
}

/// Set on Less Than (signed)
fn op_slt(psx: &mut Psx, instruction: Instruction) {
    let s = psx.cpu.reg(instruction.s()) as i32;
    let t = psx.cpu.reg(instruction.t()) as i32;

    psx.cpu.load(instruction.d(), (s < t) as u32);
}

/// Set on Less Than Unsigned
fn op_sltu(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) < psx.cpu.reg(instruction.t());

    psx.cpu.load(instruction.d(), v as u32);
}

/// Various branch instructions: BGEZ, BLTZ, BGEZAL, BLTZAL. Bits [20:16] are used to figure out
/// which one to use
fn op_bxx(psx: &mut Psx, instruction: Instruction) {
    let rt = instruction.t().0;

    if !matches!(rt, 0x00 | 0x01 | 0x10 | 0x11) {
        psx.cpu.advance_pc();
        return;
    }

    let ra = psx.cpu.pc.wrapping_add(8);
    let v = psx.cpu.reg(instruction.s()) as i32;

    // Bit 0 selects BGEZ over BLTZ
    let cond = if rt & 1 != 0 { v >= 0 } else { v < 0 };

    branch_if(psx, instruction, cond);

    // The link variants always update RA, even if the branch isn't taken
    if rt & 0x10 != 0 {
        psx.cpu.set_reg(RegisterIndex(31), ra);
    }
}

/// Jump
fn op_j(psx: &mut Psx, instruction: Instruction) {
    let target = (psx.cpu.pc.wrapping_add(4) & 0xf000_0000) | instruction.imm_jump();

    psx.cpu.delayed_branch(target);
}

/// Jump And Link
fn op_jal(psx: &mut Psx, instruction: Instruction) {
    let ra = psx.cpu.pc.wrapping_add(8);

    op_j(psx, instruction);

    psx.cpu.set_reg(RegisterIndex(31), ra);
}

/// Branch if Equal
fn op_beq(psx: &mut Psx, instruction: Instruction) {
    let cond = psx.cpu.reg(instruction.s()) == psx.cpu.reg(instruction.t());

    branch_if(psx, instruction, cond);
}

/// Branch if Not Equal
fn op_bne(psx: &mut Psx, instruction: Instruction) {
    let cond = psx.cpu.reg(instruction.s()) != psx.cpu.reg(instruction.t());

    branch_if(psx, instruction, cond);
}

/// Branch if Less than or Equal to Zero
fn op_blez(psx: &mut Psx, instruction: Instruction) {
    if instruction.t().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    let cond = (psx.cpu.reg(instruction.s()) as i32) <= 0;

    branch_if(psx, instruction, cond);
}

/// Branch if Greater Than Zero
fn op_bgtz(psx: &mut Psx, instruction: Instruction) {
    if instruction.t().0 != 0 {
        op_illegal(psx, instruction);
        return;
    }

    let cond = (psx.cpu.reg(instruction.s()) as i32) > 0;

    branch_if(psx, instruction, cond);
}

/// Add Immediate and check for signed overflow
fn op_addi(psx: &mut Psx, instruction: Instruction) {
    let s = psx.cpu.reg(instruction.s()) as i32;
    let i = instruction.imm_se() as i32;

    match s.checked_add(i) {
        Some(v) => psx.cpu.load(instruction.t(), v as u32),
        None => psx.cpu.exception(Exception::Overflow),
    }
}

/// Add Immediate Unsigned. With R0 as destination it's used as a call into the IOP library.
fn op_addiu(psx: &mut Psx, instruction: Instruction) {
    if instruction.t().0 == 0 {
        let pc = psx.cpu.pc;

        psx.bus
            .iop_call(pc, instruction.imm() as u16, &mut psx.cpu.regs);
        psx.cpu.regs[0] = 0;
        psx.cpu.advance_pc();
        return;
    }

    let v = psx
        .cpu
        .reg(instruction.s())
        .wrapping_add(instruction.imm_se());

    psx.cpu.load(instruction.t(), v);
}

/// Set if Less Than Immediate (signed)
fn op_slti(psx: &mut Psx, instruction: Instruction) {
    let v = (psx.cpu.reg(instruction.s()) as i32) < (instruction.imm_se() as i32);

    psx.cpu.load(instruction.t(), v as u32);
}

/// Set if Less Than Immediate Unsigned
fn op_sltiu(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) < instruction.imm_se();

    psx.cpu.load(instruction.t(), v as u32);
}

/// Bitwise And Immediate
fn op_andi(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) & instruction.imm();

    psx.cpu.load(instruction.t(), v);
}

/// Bitwise Or Immediate
fn op_ori(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) | instruction.imm();

    psx.cpu.load(instruction.t(), v);
}

/// Bitwise eXclusive Or Immediate
fn op_xori(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.s()) ^ instruction.imm();

    psx.cpu.load(instruction.t(), v);
}

/// Load Upper Immediate
fn op_lui(psx: &mut Psx, instruction: Instruction) {
    psx.cpu.load(instruction.t(), instruction.imm() << 16);
}

/// Coprocessor 0 opcode
fn op_cop0(psx: &mut Psx, instruction: Instruction) {
    if !psx.cpu.cop0.cop_usable(0) {
        coprocessor_unusable(psx, 0);
        return;
    }

    if instruction.is_cop_command() {
        match instruction.function() {
            0x10 => op_rfe(psx, instruction),
            _ => {
                psx.cpu.unsupported("COP0 command");
                psx.cpu.advance_pc();
            }
        }
    } else {
        match instruction.cop_opcode() {
            0b00000 => op_mfc0(psx, instruction),
            0b00100 => op_mtc0(psx, instruction),
            _ => {
                psx.cpu.unsupported("COP0 opcode");
                psx.cpu.advance_pc();
            }
        }
    }
}

/// Move To Coprocessor 0
fn op_mtc0(psx: &mut Psx, instruction: Instruction) {
    let cop_r = instruction.d().0 as usize;
    let v = psx
        .cpu
        .cop0
        .masked_write(cop_r, psx.cpu.reg(instruction.t()));

    // Move on first, an interrupt triggered by the write returns to the next instruction
    psx.cpu.advance_pc();

    if psx.cpu.set_cop0_reg(cop_r, v).is_active() {
        trace!("MTC0 to r{} triggered an interrupt", cop_r);
    }
}

/// Move From Coprocessor 0
fn op_mfc0(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.cop0.reg(instruction.d().0 as usize);

    psx.cpu.delayed_load(instruction.t(), v);
}

/// Return From Exception. Doesn't actually jump anywhere but tells the coprocessor to return to
/// the mode it was in when the exception occurred.
fn op_rfe(psx: &mut Psx, _: Instruction) {
    psx.cpu.advance_pc();

    psx.cpu.cop0.return_from_exception();

    // Rewrite SR through the CPU so that a pending interrupt unmasked by the pop is taken
    let sr = psx.cpu.cop0.sr();

    if psx.cpu.set_cop0_reg(cop0::SR, sr).is_active() {
        trace!("RFE triggered an interrupt");
    }
}

/// Coprocessor 1 opcode (does not exist on the PlayStation)
fn op_cop1(psx: &mut Psx, _: Instruction) {
    if !psx.cpu.cop0.cop_usable(1) {
        coprocessor_unusable(psx, 1);
        return;
    }

    psx.cpu.unsupported("COP1 instruction");
    psx.cpu.advance_pc();
}

/// Coprocessor 2 opcode (GTE)
fn op_cop2(psx: &mut Psx, instruction: Instruction) {
    if !psx.cpu.cop0.cop_usable(2) {
        coprocessor_unusable(psx, 2);
        return;
    }

    if instruction.is_cop_command() {
        psx.cpu.gte.command(instruction.gte_command());
        psx.cpu.advance_pc();
        return;
    }

    match instruction.cop_opcode() {
        0b00000 => op_mfc2(psx, instruction),
        0b00010 => op_cfc2(psx, instruction),
        0b00100 => op_mtc2(psx, instruction),
        0b00110 => op_ctc2(psx, instruction),
        _ => {
            psx.cpu.unsupported("COP2 opcode");
            psx.cpu.advance_pc();
        }
    }
}

/// Move From Coprocessor 2 Data register
fn op_mfc2(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.gte.data(instruction.d().0);

    psx.cpu.delayed_load(instruction.t(), v);
}

/// Move From Coprocessor 2 Control register
fn op_cfc2(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.gte.control(instruction.d().0);

    psx.cpu.delayed_load(instruction.t(), v);
}

/// Move To Coprocessor 2 Data register
fn op_mtc2(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.t());

    psx.cpu.gte.set_data(instruction.d().0, v);
    psx.cpu.advance_pc();
}

/// Move To Coprocessor 2 Control register
fn op_ctc2(psx: &mut Psx, instruction: Instruction) {
    let v = psx.cpu.reg(instruction.t());

    psx.cpu.gte.set_control(instruction.d().0, v);
    psx.cpu.advance_pc();
}

/// Load Byte (signed)
fn op_lb(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "load while cache is isolated")
        || !check_address(psx, addr, 0, Exception::LoadAddressError)
    {
        return;
    }

    let addr = swizzle::<u8>(psx, addr);
    let v = load::<u8>(psx.bus, addr) as i8;

    psx.cpu.delayed_load(instruction.t(), v as u32);
}

/// Load Halfword (signed)
fn op_lh(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "load while cache is isolated")
        || !check_address(psx, addr, 1, Exception::LoadAddressError)
    {
        return;
    }

    let addr = swizzle::<u16>(psx, addr);
    let v = load::<u16>(psx.bus, addr) as i16;

    psx.cpu.delayed_load(instruction.t(), v as u32);
}

/// Load Word Left
fn op_lwl(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "load while cache is isolated")
        || !check_address(psx, addr, 0, Exception::LoadAddressError)
    {
        return;
    }

    // This instruction bypasses the load delay restriction: it merges with a load that's still
    // pending on the same register
    let cur_v = psx.cpu.reg_with_pending_load(instruction.t());

    // Next we load the *aligned* word containing the first addressed byte
    let aligned_word = load::<u32>(psx.bus, addr & !3);

    // Depending on the address alignment we fetch the 1, 2, 3 or 4 *most* significant bytes and
    // put them in the target register.
    let v = if psx.cpu.cop0.reverse_endian() {
        let keep = 0x00ff_ffff >> ((addr & 3) * 8);

        (cur_v & keep) | (aligned_word & !keep)
    } else {
        match addr & 3 {
            0 => (cur_v & 0x00ff_ffff) | (aligned_word << 24),
            1 => (cur_v & 0x0000_ffff) | (aligned_word << 16),
            2 => (cur_v & 0x0000_00ff) | (aligned_word << 8),
            _ => aligned_word,
        }
    };

    psx.cpu.delayed_load(instruction.t(), v);
}

/// Load Word. Alignment isn't checked.
fn op_lw(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "load while cache is isolated") {
        return;
    }

    let v = load::<u32>(psx.bus, addr);

    psx.cpu.delayed_load(instruction.t(), v);
}

/// Load Byte Unsigned
fn op_lbu(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "load while cache is isolated")
        || !check_address(psx, addr, 0, Exception::LoadAddressError)
    {
        return;
    }

    let addr = swizzle::<u8>(psx, addr);
    let v = load::<u8>(psx.bus, addr);

    psx.cpu.delayed_load(instruction.t(), v as u32);
}

/// Load Halfword Unsigned
fn op_lhu(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "load while cache is isolated")
        || !check_address(psx, addr, 1, Exception::LoadAddressError)
    {
        return;
    }

    let addr = swizzle::<u16>(psx, addr);
    let v = load::<u16>(psx.bus, addr);

    psx.cpu.delayed_load(instruction.t(), v as u32);
}

/// Load Word Right
fn op_lwr(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "load while cache is isolated")
        || !check_address(psx, addr, 0, Exception::LoadAddressError)
    {
        return;
    }

    let cur_v = psx.cpu.reg_with_pending_load(instruction.t());

    let aligned_word = load::<u32>(psx.bus, addr & !3);

    // Depending on the address alignment we fetch the 1, 2, 3 or 4 *least* significant bytes and
    // put them in the target register.
    let v = if psx.cpu.cop0.reverse_endian() {
        let take = 0xffff_ffff >> ((addr & 3) * 8);

        (cur_v & !take) | (aligned_word & take)
    } else {
        match addr & 3 {
            0 => aligned_word,
            1 => (cur_v & 0xff00_0000) | (aligned_word >> 8),
            2 => (cur_v & 0xffff_0000) | (aligned_word >> 16),
            _ => (cur_v & 0xffff_ff00) | (aligned_word >> 24),
        }
    };

    psx.cpu.delayed_load(instruction.t(), v);
}

/// Store Byte
fn op_sb(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "store while cache is isolated")
        || !check_address(psx, addr, 0, Exception::StoreAddressError)
    {
        return;
    }

    let addr = swizzle::<u8>(psx, addr);
    let v = psx.cpu.reg(instruction.t());

    store(psx.bus, addr, v as u8);
    psx.cpu.advance_pc();
}

/// Store Halfword
fn op_sh(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "store while cache is isolated")
        || !check_address(psx, addr, 1, Exception::StoreAddressError)
    {
        return;
    }

    let addr = swizzle::<u16>(psx, addr);
    let v = psx.cpu.reg(instruction.t());

    store(psx.bus, addr, v as u16);
    psx.cpu.advance_pc();
}

/// Store Word Left
fn op_swl(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "store while cache is isolated")
        || !check_address(psx, addr, 0, Exception::StoreAddressError)
    {
        return;
    }

    let v = psx.cpu.reg(instruction.t());

    let aligned_addr = addr & !3;
    // Load the current value for the aligned word at the target address
    let cur_mem = load::<u32>(psx.bus, aligned_addr);

    let mem = if psx.cpu.cop0.reverse_endian() {
        let keep = 0x00ff_ffff >> ((addr & 3) * 8);

        (cur_mem & keep) | (v & !keep)
    } else {
        match addr & 3 {
            0 => (cur_mem & 0xffff_ff00) | (v >> 24),
            1 => (cur_mem & 0xffff_0000) | (v >> 16),
            2 => (cur_mem & 0xff00_0000) | (v >> 8),
            _ => v,
        }
    };

    store(psx.bus, aligned_addr, mem);
    psx.cpu.advance_pc();
}

/// Store Word. Alignment isn't checked.
fn op_sw(psx: &mut Psx, instruction: Instruction) {
    // The boot code clears the instruction cache with SWs while the cache is isolated, drop them
    // silently
    if psx.cpu.cop0.cache_isolated() {
        psx.cpu.advance_pc();
        return;
    }

    let addr = effective_address(psx, instruction);
    let v = psx.cpu.reg(instruction.t());

    store(psx.bus, addr, v);
    psx.cpu.advance_pc();
}

/// Store Word Right
fn op_swr(psx: &mut Psx, instruction: Instruction) {
    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "store while cache is isolated")
        || !check_address(psx, addr, 0, Exception::StoreAddressError)
    {
        return;
    }

    let v = psx.cpu.reg(instruction.t());

    let aligned_addr = addr & !3;
    let cur_mem = load::<u32>(psx.bus, aligned_addr);

    let mem = if psx.cpu.cop0.reverse_endian() {
        let take = 0xffff_ffff >> ((addr & 3) * 8);

        (cur_mem & !take) | (v & take)
    } else {
        match addr & 3 {
            0 => v,
            1 => (cur_mem & 0x0000_00ff) | (v << 8),
            2 => (cur_mem & 0x0000_ffff) | (v << 16),
            _ => (cur_mem & 0x00ff_ffff) | (v << 24),
        }
    };

    store(psx.bus, aligned_addr, mem);
    psx.cpu.advance_pc();
}

/// Load Word in Coprocessor 1
fn op_lwc1(psx: &mut Psx, _: Instruction) {
    psx.cpu.unsupported("LWC1");
    psx.cpu.advance_pc();
}

/// Load Word in Coprocessor 2
fn op_lwc2(psx: &mut Psx, instruction: Instruction) {
    if !psx.cpu.cop0.cop_usable(2) {
        coprocessor_unusable(psx, 2);
        return;
    }

    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "LWC2 while cache is isolated")
        || !check_address(psx, addr, 3, Exception::LoadAddressError)
    {
        return;
    }

    let v = load::<u32>(psx.bus, addr);

    psx.cpu.gte.set_data(instruction.t().0, v);
    psx.cpu.advance_pc();
}

/// Store Word in Coprocessor 1
fn op_swc1(psx: &mut Psx, _: Instruction) {
    psx.cpu.unsupported("SWC1");
    psx.cpu.advance_pc();
}

/// Store Word in Coprocessor 2
fn op_swc2(psx: &mut Psx, instruction: Instruction) {
    if !psx.cpu.cop0.cop_usable(2) {
        coprocessor_unusable(psx, 2);
        return;
    }

    let addr = effective_address(psx, instruction);

    if cache_isolated(psx, "SWC2 while cache is isolated")
        || !check_address(psx, addr, 3, Exception::StoreAddressError)
    {
        return;
    }

    let v = psx.cpu.gte.data(instruction.t().0);

    store(psx.bus, addr, v);
    psx.cpu.advance_pc();
}

/// Illegal instruction
fn op_illegal(psx: &mut Psx, instruction: Instruction) {
    warn!(
        "Illegal instruction {} at PC 0x{:08x}!",
        instruction, psx.cpu.pc
    );

    psx.cpu.exception(Exception::IllegalInstruction);
}

/// Handler table for the main opcodes (instruction bits [31:26])
#[rustfmt::skip]
const OPCODE_HANDLERS: [fn(&mut Psx, Instruction); 64] = [
    // 0x00
    op_function, op_bxx,      op_j,        op_jal,
    op_beq,      op_bne,      op_blez,     op_bgtz,
    op_addi,     op_addiu,    op_slti,     op_sltiu,
    op_andi,     op_ori,      op_xori,     op_lui,
    // 0x10
    op_cop0,     op_cop1,     op_cop2,     op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    // 0x20
    op_lb,       op_lh,       op_lwl,      op_lw,
    op_lbu,      op_lhu,      op_lwr,      op_illegal,
    op_sb,       op_sh,       op_swl,      op_sw,
    op_illegal,  op_illegal,  op_swr,      op_illegal,
    // 0x30
    op_illegal,  op_lwc1,     op_lwc2,     op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_swc1,     op_swc2,     op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
];

/// Handler table for the function codes (instruction bits [5:0] when opcode is 0)
#[rustfmt::skip]
const FUNCTION_HANDLERS: [fn(&mut Psx, Instruction); 64] = [
    // 0x00
    op_sll,      op_illegal,  op_srl,      op_sra,
    op_sllv,     op_illegal,  op_srlv,     op_srav,
    op_jr,       op_jalr,     op_illegal,  op_hle,
    op_syscall,  op_break,    op_illegal,  op_illegal,
    // 0x10
    op_mfhi,     op_mthi,     op_mflo,     op_mtlo,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_mult,     op_multu,    op_div,      op_divu,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    // 0x20
    op_add,      op_addu,     op_sub,      op_subu,
    op_and,      op_or,       op_xor,      op_nor,
    op_illegal,  op_illegal,  op_slt,      op_sltu,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    // 0x30
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
];
