use crate::instruction::{Callee, Instruction, Target};
use crate::val::{Value, Var};
use std::{cell::Cell, fmt};

pub trait InstructionFormatter {
    fn format_instruction<W: fmt::Write>(
        &self,
        instruction: &Instruction,
        f: &mut W,
    ) -> fmt::Result {
        const IX_WIDTH: usize = 8;
        match instruction {
            Instruction::Comment(comment) => write!(f, "{:>width$} {}", "//", comment, width = IX_WIDTH),
            Instruction::Nop => write!(f, "{:>width$}", "nop", width = IX_WIDTH),

            Instruction::Push(val) => {
                write!(f, "{:>width$} ", "push", width = IX_WIDTH)?;
                self.format_val(val, f)
            }
            Instruction::Pop => write!(f, "{:>width$}", "pop", width = IX_WIDTH),
            Instruction::Dup => write!(f, "{:>width$}", "dup", width = IX_WIDTH),
            Instruction::Swap => write!(f, "{:>width$}", "swap", width = IX_WIDTH),

            Instruction::Load(var) => {
                write!(f, "{:>width$} ", "load", width = IX_WIDTH)?;
                self.format_var(var, f)
            }
            Instruction::Store(var) => {
                write!(f, "{:>width$} ", "store", width = IX_WIDTH)?;
                self.format_var(var, f)
            }
            Instruction::AddrOf(var) => {
                write!(f, "{:>width$} @", "addrof", width = IX_WIDTH)?;
                self.format_var(var, f)
            }
            Instruction::LoadIndirect => write!(f, "{:>width$}", "ldind", width = IX_WIDTH),
            Instruction::StoreIndirect => write!(f, "{:>width$}", "stind", width = IX_WIDTH),

            Instruction::Element { array_ty } => {
                write!(f, "{:>width$} {}[]", "el", array_ty, width = IX_WIDTH)
            }
            Instruction::Field { record_ty, field } => {
                write!(f, "{:>width$} {}.{}", "field", record_ty, field, width = IX_WIDTH)
            }

            Instruction::BinOp(op) => write!(f, "{:>width$}", op.mnemonic(), width = IX_WIDTH),
            Instruction::UnOp(op) => write!(f, "{:>width$}", op.mnemonic(), width = IX_WIDTH),

            Instruction::Jump(target) => {
                write!(f, "{:>width$} ", "jmp", width = IX_WIDTH)?;
                self.format_target(target, f)
            }
            Instruction::JumpIf(target) => {
                write!(f, "{:>width$} ", "jmpif", width = IX_WIDTH)?;
                self.format_target(target, f)
            }
            Instruction::JumpIfNot(target) => {
                write!(f, "{:>width$} ", "jmpnot", width = IX_WIDTH)?;
                self.format_target(target, f)
            }

            Instruction::Call { callee, arg_count } => {
                write!(f, "{:>width$} ", "call", width = IX_WIDTH)?;
                self.format_callee(callee, f)?;
                write!(f, "/{}", arg_count)
            }
            Instruction::Builtin { name, arg_count } => {
                write!(f, "{:>width$} {}/{}", "builtin", name, arg_count, width = IX_WIDTH)
            }

            Instruction::Enter { depth, locals } => {
                write!(f, "{:>width$} level {}, {} locals", "enter", depth, locals, width = IX_WIDTH)
            }
            Instruction::Leave => write!(f, "{:>width$}", "leave", width = IX_WIDTH),
            Instruction::Return => write!(f, "{:>width$}", "ret", width = IX_WIDTH),
            Instruction::Halt => write!(f, "{:>width$}", "halt", width = IX_WIDTH),
        }
    }

    fn format_val(&self, val: &Value, f: &mut dyn fmt::Write) -> fmt::Result;
    fn format_var(&self, var: &Var, f: &mut dyn fmt::Write) -> fmt::Result;
    fn format_target(&self, target: &Target, f: &mut dyn fmt::Write) -> fmt::Result;
    fn format_callee(&self, callee: &Callee, f: &mut dyn fmt::Write) -> fmt::Result;
}

pub struct RawInstructionFormatter;

impl InstructionFormatter for RawInstructionFormatter {
    fn format_val(&self, val: &Value, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", val)
    }

    fn format_var(&self, var: &Var, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", var)
    }

    fn format_target(&self, target: &Target, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", target)
    }

    fn format_callee(&self, callee: &Callee, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", callee)
    }
}

// indents the body of each routine between its enter and leave instructions
pub struct StatefulIndentedFormatter<'f, F: InstructionFormatter> {
    wrapped: &'f F,
    tabs: Cell<usize>,
    tab_width: usize,
}

impl<'f, F: InstructionFormatter> StatefulIndentedFormatter<'f, F> {
    pub fn new(wrapped: &'f F, tab_width: usize) -> Self {
        Self {
            wrapped,
            tabs: Cell::new(0),
            tab_width,
        }
    }
}

impl<'f, F: InstructionFormatter> InstructionFormatter for StatefulIndentedFormatter<'f, F> {
    fn format_instruction<W: fmt::Write>(
        &self,
        instruction: &Instruction,
        f: &mut W,
    ) -> fmt::Result {
        if let Instruction::Leave = instruction {
            self.tabs.set(self.tabs.get().saturating_sub(1));
        }

        for _ in 0..self.tabs.get() * self.tab_width {
            f.write_char(' ')?;
        }

        if let Instruction::Enter { .. } = instruction {
            self.tabs.set(self.tabs.get() + 1);
        }

        self.wrapped.format_instruction(instruction, f)
    }

    fn format_val(&self, val: &Value, f: &mut dyn fmt::Write) -> fmt::Result {
        self.wrapped.format_val(val, f)
    }

    fn format_var(&self, var: &Var, f: &mut dyn fmt::Write) -> fmt::Result {
        self.wrapped.format_var(var, f)
    }

    fn format_target(&self, target: &Target, f: &mut dyn fmt::Write) -> fmt::Result {
        self.wrapped.format_target(target, f)
    }

    fn format_callee(&self, callee: &Callee, f: &mut dyn fmt::Write) -> fmt::Result {
        self.wrapped.format_callee(callee, f)
    }
}

/// Writes one instruction per line, numbered from `base`.
pub fn write_instruction_list<F: InstructionFormatter>(
    f: &mut dyn fmt::Write,
    formatter: &F,
    instructions: &[Instruction],
    base: usize,
) -> fmt::Result {
    let num_len = (base + instructions.len()).to_string().len();

    let formatter = StatefulIndentedFormatter::new(formatter, 4);

    for (i, instruction) in instructions.iter().enumerate() {
        write!(f, "{:>width$}|", base + i, width = num_len)?;

        let mut line = String::new();
        formatter.format_instruction(instruction, &mut line)?;
        writeln!(f, "{}", line)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::BinOp;

    #[test]
    fn formats_operands() {
        let call = Instruction::Call {
            callee: Callee::qualified("Unit1", "F"),
            arg_count: 2,
        };
        assert_eq!("    call Unit1.F/2", call.to_string());

        let load = Instruction::Load(Var::frame(1, 3));
        assert_eq!("    load L3^1", load.to_string());

        let jump = Instruction::JumpIfNot(Target::Address(12));
        assert_eq!("  jmpnot @12", jump.to_string());
    }

    #[test]
    fn list_indents_routine_bodies() {
        let instructions = vec![
            Instruction::Enter { depth: 1, locals: 0 },
            Instruction::BinOp(BinOp::Add),
            Instruction::Leave,
        ];

        let mut out = String::new();
        write_instruction_list(&mut out, &RawInstructionFormatter, &instructions, 8).unwrap();

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(3, lines.len());
        assert!(lines[0].starts_with(" 8|   enter"));
        assert!(lines[1].starts_with(" 9|         add"));
        assert!(lines[2].starts_with("10|   leave"));
    }
}
