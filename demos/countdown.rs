use color_eyre::eyre::Result;

use log::LevelFilter;
use simple_logger::SimpleLogger;
use synvm::console::StdConsole;
use synvm::memory::StdMem;
use synvm::operand::reg;
use synvm::processor::Processor;
use synvm::write_instructions;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()?; // logging

    let mut mem = StdMem::default();
    let mut cpu = Processor::default();

    // prints the digits 9 down to 0, one per line
    use synvm::processor::Instruction::*;
    write_instructions!(mem : 0 =>
        Set, reg(0), 9,
        // loop: 3
        Add, reg(1), reg(0), b'0',
        Out, reg(1),
        Out, b'\n',
        Jf, reg(0), 20,
        Add, reg(0), reg(0), 32767, // decrement by adding -1
        Jmp, 3,
        // done: 20
        Halt
    )?;

    cpu.run(&mut mem, &mut StdConsole).into_result()
}
