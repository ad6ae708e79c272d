use crate::console::Console;
use crate::fault::{Fault, FaultKind, Result};
use crate::memory::{Memory, Word, MAX_VALUE, MODULUS};
use crate::operand::{destination, resolve};
use crate::register::Registers;
use crate::stack::Stack;
use color_eyre::eyre::{self, eyre};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Raw operand words following an opcode. Positions past the arity of the
/// instruction are never fetched and stay zero.
pub type Operands = [Word; 3];

/// Opcode handler, looked up through [`Instruction::handler`]
pub type Handler<const S: usize> =
    fn(&mut Processor, &mut Memory<S>, &mut dyn Console, Operands) -> Result<Flow>;

/// Where execution continues after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the instruction right after this one
    Advance,
    /// Continue at the given address
    Jump(Word),
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Running,
    Halted,
}

/// Outcome of a single successful step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halted,
}

pub type StepResult = std::result::Result<Step, Fault>;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The program executed `Halt`
    Halted,
    Faulted(Fault),
    /// The host asked to stop between two steps
    Interrupted { steps: u64 },
}

impl ExitReason {
    pub fn into_result(self) -> eyre::Result<()> {
        match self {
            ExitReason::Halted => Ok(()),
            ExitReason::Faulted(fault) => Err(fault.into()),
            ExitReason::Interrupted { steps } => Err(eyre!("Interrupted after {} steps", steps)),
        }
    }
}

/// Emulates the CPU: registers, stack and program counter. Memory and
/// character I/O are handed in by the host on every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processor {
    /// Program counter
    pub pc: Word,
    pub registers: Registers,
    pub stack: Stack,
    state: State,
    fault: Option<Fault>,
    steps: u64,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Processor {
    /// Initializes a new CPU
    /// @param entrypoint The start of the program
    pub fn new(entrypoint: Word) -> Self {
        Self {
            pc: entrypoint,
            registers: Registers::default(),
            stack: Stack::default(),
            state: State::Running,
            fault: None,
            steps: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The fault that stopped the machine, if any
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Number of instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Fetches, decodes and executes the instruction at `pc`.
    ///
    /// A fault halts the machine and leaves the state of the faulting
    /// instruction untouched. Stepping a halted machine does nothing.
    pub fn step<const S: usize>(
        &mut self,
        memory: &mut Memory<S>,
        console: &mut dyn Console,
    ) -> StepResult {
        if self.state == State::Halted {
            return match self.fault {
                Some(fault) => Err(fault),
                None => Ok(Step::Halted),
            };
        }

        let pc = self.pc;
        if pc as usize >= memory.extent() {
            return Err(self.raise(Fault::new(
                FaultKind::ProgramCounterOutOfBounds(pc),
                None,
                pc,
            )));
        }

        let opcode = memory
            .read(pc)
            .map_err(|kind| self.raise(Fault::new(kind, None, pc)))?;

        match self.execute(opcode, memory, console) {
            Ok(Flow::Halt) => {
                self.steps += 1;
                self.state = State::Halted;
                info!("Halted [pc: {}]", pc);
                Ok(Step::Halted)
            }
            Ok(_) => {
                self.steps += 1;
                Ok(Step::Continue)
            }
            Err(kind) => Err(self.raise(Fault::new(kind, opcode, pc))),
        }
    }

    fn execute<const S: usize>(
        &mut self,
        opcode: Word,
        memory: &mut Memory<S>,
        console: &mut dyn Console,
    ) -> Result<Flow> {
        let instruction =
            Instruction::try_from(opcode).map_err(|_| FaultKind::UnknownOpcode(opcode))?;

        let mut operands = [0; 3];
        for (offset, operand) in (1..).zip(operands.iter_mut().take(instruction.arity())) {
            *operand = memory.read(self.pc + offset)?;
        }

        let flow = instruction.handler::<S>()(self, memory, console, operands)?;
        match flow {
            Flow::Advance => self.pc += 1 + instruction.arity() as Word,
            Flow::Jump(target) => self.pc = target,
            Flow::Halt => {}
        }

        Ok(flow)
    }

    fn raise(&mut self, fault: Fault) -> Fault {
        error!("{}", fault);
        self.state = State::Halted;
        self.fault = Some(fault);
        fault
    }

    /// Runs the program until it halts or faults
    pub fn run<const S: usize>(
        &mut self,
        memory: &mut Memory<S>,
        console: &mut dyn Console,
    ) -> ExitReason {
        self.run_until(memory, console, |_| false)
    }

    /// Runs the program, stopping after at most `max_steps` instructions
    pub fn run_with_limit<const S: usize>(
        &mut self,
        memory: &mut Memory<S>,
        console: &mut dyn Console,
        max_steps: u64,
    ) -> ExitReason {
        let limit = self.steps.saturating_add(max_steps);
        self.run_until(memory, console, |cpu| cpu.steps >= limit)
    }

    /// Runs the program, checking `stop` before every step
    pub fn run_until<const S: usize, F>(
        &mut self,
        memory: &mut Memory<S>,
        console: &mut dyn Console,
        mut stop: F,
    ) -> ExitReason
    where
        F: FnMut(&Processor) -> bool,
    {
        loop {
            if self.state == State::Running && stop(&*self) {
                debug!("Interrupted after {} steps", self.steps);
                return ExitReason::Interrupted { steps: self.steps };
            }

            match self.step(memory, console) {
                Ok(Step::Continue) => {}
                Ok(Step::Halted) => return ExitReason::Halted,
                Err(fault) => return ExitReason::Faulted(fault),
            }
        }
    }

    fn halt<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        _: Operands,
    ) -> Result<Flow> {
        debug!("HALT");
        Ok(Flow::Halt)
    }

    fn set<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, b, _]: Operands,
    ) -> Result<Flow> {
        let register = destination(a)?;
        let value = resolve(&self.registers, b)?;
        self.registers.write(register, value);

        debug!("SET {} {}", register, value);
        Ok(Flow::Advance)
    }

    fn push<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, _, _]: Operands,
    ) -> Result<Flow> {
        let value = resolve(&self.registers, a)?;
        self.stack.push(value)?;

        debug!("PUSH {}", value);
        Ok(Flow::Advance)
    }

    fn pop<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, _, _]: Operands,
    ) -> Result<Flow> {
        let register = destination(a)?;
        let value = self.stack.pop()?;
        self.registers.write(register, value);

        debug!("POP {}: {}", register, value);
        Ok(Flow::Advance)
    }

    fn equal<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        operands: Operands,
    ) -> Result<Flow> {
        self.binary("EQ", operands, |b, c| Ok((b == c) as u32))
    }

    fn greater<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        operands: Operands,
    ) -> Result<Flow> {
        self.binary("GT", operands, |b, c| Ok((b > c) as u32))
    }

    fn jmp<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, _, _]: Operands,
    ) -> Result<Flow> {
        let target = resolve(&self.registers, a)?;

        debug!("JMP {}", target);
        Ok(Flow::Jump(target))
    }

    fn jt<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, b, _]: Operands,
    ) -> Result<Flow> {
        let condition = resolve(&self.registers, a)?;
        let target = resolve(&self.registers, b)?;

        debug!("JT {} {}", condition, target);
        Ok(if condition != 0 {
            Flow::Jump(target)
        } else {
            Flow::Advance
        })
    }

    fn jf<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, b, _]: Operands,
    ) -> Result<Flow> {
        let condition = resolve(&self.registers, a)?;
        let target = resolve(&self.registers, b)?;

        debug!("JF {} {}", condition, target);
        Ok(if condition == 0 {
            Flow::Jump(target)
        } else {
            Flow::Advance
        })
    }

    fn add<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        operands: Operands,
    ) -> Result<Flow> {
        self.binary("ADD", operands, |b, c| Ok(b + c))
    }

    fn mult<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        operands: Operands,
    ) -> Result<Flow> {
        self.binary("MULT", operands, |b, c| Ok(b * c))
    }

    fn modulo<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        operands: Operands,
    ) -> Result<Flow> {
        self.binary("MOD", operands, |b, c| {
            b.checked_rem(c).ok_or(FaultKind::DivisionByZero)
        })
    }

    fn and<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        operands: Operands,
    ) -> Result<Flow> {
        self.binary("AND", operands, |b, c| Ok(b & c))
    }

    fn or<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        operands: Operands,
    ) -> Result<Flow> {
        self.binary("OR", operands, |b, c| Ok(b | c))
    }

    fn not<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, b, _]: Operands,
    ) -> Result<Flow> {
        let register = destination(a)?;
        let value = resolve(&self.registers, b)?;
        let result = !value & MAX_VALUE;
        self.registers.write(register, result);

        debug!("NOT {} {}: {}", register, value, result);
        Ok(Flow::Advance)
    }

    fn rmem<const S: usize>(
        &mut self,
        memory: &mut Memory<S>,
        _: &mut dyn Console,
        [a, b, _]: Operands,
    ) -> Result<Flow> {
        let register = destination(a)?;
        let address = resolve(&self.registers, b)?;
        let value = memory.read(address)?;
        self.registers.write(register, value);

        debug!("RMEM {} {}: {}", register, address, value);
        Ok(Flow::Advance)
    }

    fn wmem<const S: usize>(
        &mut self,
        memory: &mut Memory<S>,
        _: &mut dyn Console,
        [a, b, _]: Operands,
    ) -> Result<Flow> {
        let address = resolve(&self.registers, a)?;
        let value = resolve(&self.registers, b)?;
        memory.write(address, value)?;

        debug!("WMEM {} {}", address, value);
        Ok(Flow::Advance)
    }

    fn call<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        [a, _, _]: Operands,
    ) -> Result<Flow> {
        let target = resolve(&self.registers, a)?;
        self.stack.push(self.pc + 2)?; // address of the next instruction

        debug!("CALL {}", target);
        Ok(Flow::Jump(target))
    }

    fn ret<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        _: Operands,
    ) -> Result<Flow> {
        let target = self.stack.pop()?;

        debug!("RET {}", target);
        Ok(Flow::Jump(target))
    }

    fn out<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        console: &mut dyn Console,
        [a, _, _]: Operands,
    ) -> Result<Flow> {
        let value = resolve(&self.registers, a)?;
        console.write_byte(value as u8);

        debug!("OUT {}", value);
        Ok(Flow::Advance)
    }

    fn input<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        console: &mut dyn Console,
        [a, _, _]: Operands,
    ) -> Result<Flow> {
        let register = destination(a)?;
        let byte = console.read_byte().ok_or(FaultKind::InputExhausted)?;
        self.registers.write(register, byte as Word);

        debug!("IN {}: {}", register, byte);
        Ok(Flow::Advance)
    }

    fn noop<const S: usize>(
        &mut self,
        _: &mut Memory<S>,
        _: &mut dyn Console,
        _: Operands,
    ) -> Result<Flow> {
        debug!("NOOP");
        Ok(Flow::Advance)
    }

    /// `reg[a] = op(resolve(b), resolve(c)) mod 32768`
    fn binary<F>(&mut self, name: &str, [a, b, c]: Operands, op: F) -> Result<Flow>
    where
        F: FnOnce(u32, u32) -> Result<u32>,
    {
        let register = destination(a)?;
        let b = resolve(&self.registers, b)?;
        let c = resolve(&self.registers, c)?;
        let result = (op(b as u32, c as u32)? % MODULUS) as Word;
        self.registers.write(register, result);

        debug!("{} {} {} {}: {}", name, register, b, c, result);
        Ok(Flow::Advance)
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal ( $arity:literal ) => $handler:ident , )+ ) => {
        /// The instruction set. Each entry carries its opcode, the number of
        /// operand words that follow it and the handler executing it.
        #[repr(u16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            /// Number of operand words following the opcode
            pub fn arity(&self) -> usize {
                match self {
                    $( Self::$name => $arity , )+
                }
            }

            pub fn handler<const S: usize>(&self) -> Handler<S> {
                match self {
                    $( Self::$name => Processor::$handler::<S> as Handler<S> , )+
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// Stop execution
    Halt = 0 (0) => halt,
    /// Set register `a` to the value of `b`
    Set = 1 (2) => set,
    /// Push `a` onto the stack
    Push = 2 (1) => push,
    /// Pop the top of the stack into register `a`
    Pop = 3 (1) => pop,
    /// Set `a` to 1 if `b` equals `c`, else 0
    Eq = 4 (3) => equal,
    /// Set `a` to 1 if `b` is greater than `c`, else 0
    Gt = 5 (3) => greater,
    /// Jump to `a`
    Jmp = 6 (1) => jmp,
    /// Jump to `b` if `a` is nonzero
    Jt = 7 (2) => jt,
    /// Jump to `b` if `a` is zero
    Jf = 8 (2) => jf,
    /// Store `b + c` (mod 32768) into `a`
    Add = 9 (3) => add,
    /// Store `b * c` (mod 32768) into `a`
    Mult = 10 (3) => mult,
    /// Store the remainder of `b / c` into `a`
    Mod = 11 (3) => modulo,
    /// Store the bitwise and of `b` and `c` into `a`
    And = 12 (3) => and,
    /// Store the bitwise or of `b` and `c` into `a`
    Or = 13 (3) => or,
    /// Store the 15-bit bitwise inverse of `b` into `a`
    Not = 14 (2) => not,
    /// Read memory at address `b` into `a`
    Rmem = 15 (2) => rmem,
    /// Write `b` to memory at address `a`
    Wmem = 16 (2) => wmem,
    /// Push the address of the next instruction and jump to `a`
    Call = 17 (1) => call,
    /// Pop an address from the stack and jump to it
    Ret = 18 (0) => ret,
    /// Write the character `a` to the console
    Out = 19 (1) => out,
    /// Read a character from the console into `a`
    In = 20 (1) => input,
    /// No operation
    Noop = 21 (0) => noop,
}
