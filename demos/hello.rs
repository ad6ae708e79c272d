use color_eyre::eyre::Result;

use simple_logger::SimpleLogger;
use synvm::console::StdConsole;
use synvm::memory::StdMem;
use synvm::processor::Processor;
use synvm::write_instructions;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().init()?; // logging

    let mut mem = StdMem::default();
    let mut cpu = Processor::default();

    use synvm::processor::Instruction::*;
    write_instructions!(mem : 0 =>
        Out, b'h',
        Out, b'i',
        Out, b'\n',
        Halt
    )?;

    cpu.run(&mut mem, &mut StdConsole).into_result()
}
