//! Caller-supplied command and test tables.
//!
//! Which opcodes exist, what they are called, and what arguments they take varies with
//! the interpreter version, so the tables are an *input* to every compile/decompile
//! call, never baked into the engine. The engine consults them for name/opcode
//! resolution and for argument byte widths; it attaches no meaning to any particular
//! opcode.

use std::collections::HashMap;

use strum::{Display, EnumString};

use crate::{Error, Result};

/// The kind of a single command or test argument.
///
/// The kind determines the encoded byte width of the argument and gives the
/// surrounding tooling (parser, pretty-printer) its namespace. The engine itself only
/// uses [`byte_width`](ArgKind::byte_width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ArgKind {
    /// Immediate number
    Num,
    /// Variable index
    Var,
    /// Flag index
    Flag,
    /// Message index
    Msg,
    /// Screen object index
    SObj,
    /// Inventory object index
    IObj,
    /// String index
    Str,
    /// Controller index
    Ctrl,
    /// Dictionary word group (two bytes on the wire)
    Word,
}

impl ArgKind {
    /// Returns the encoded width of this argument kind in bytes.
    #[must_use]
    pub const fn byte_width(self) -> u32 {
        match self {
            ArgKind::Word => 2,
            _ => 1,
        }
    }
}

/// Definition of one action command opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDef {
    /// The opcode byte
    pub opcode: u8,
    /// The source-level name
    pub name: String,
    /// Argument kinds, in encoding order
    pub args: Vec<ArgKind>,
}

/// Definition of one test (condition) opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDef {
    /// The opcode byte
    pub opcode: u8,
    /// The source-level name
    pub name: String,
    /// Argument kinds, in encoding order; for variadic tests this is the kind pattern
    /// of a single argument repeated at runtime
    pub args: Vec<ArgKind>,
    /// `true` if the test takes a run-time argument count (encoded as a count byte
    /// followed by that many arguments)
    pub variadic: bool,
}

/// The opcode table contract: command and test definitions keyed by opcode and name.
///
/// Supplied by the caller per interpreter version and treated as read-only by every
/// compile/decompile call.
///
/// # Examples
///
/// ```rust
/// use logicscript::bytecode::CodeTables;
///
/// let tables = CodeTables::fixture();
/// assert_eq!(tables.command_by_name("return").unwrap().opcode, 0x00);
/// assert_eq!(tables.test_by_name("equaln").unwrap().args.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CodeTables {
    commands: HashMap<u8, CommandDef>,
    tests: HashMap<u8, TestDef>,
    command_names: HashMap<String, u8>,
    test_names: HashMap<String, u8>,
}

impl CodeTables {
    /// Builds code tables from command and test definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTables`] if an opcode or a name appears twice within
    /// one table; ambiguous lookups would make compilation nondeterministic.
    pub fn new(commands: Vec<CommandDef>, tests: Vec<TestDef>) -> Result<Self> {
        let mut tables = CodeTables {
            commands: HashMap::with_capacity(commands.len()),
            tests: HashMap::with_capacity(tests.len()),
            command_names: HashMap::with_capacity(commands.len()),
            test_names: HashMap::with_capacity(tests.len()),
        };

        for def in commands {
            if tables.command_names.contains_key(&def.name) {
                return Err(Error::InvalidTables(format!(
                    "duplicate command name '{}'",
                    def.name
                )));
            }
            if tables.commands.contains_key(&def.opcode) {
                return Err(Error::InvalidTables(format!(
                    "duplicate command opcode {:#04x}",
                    def.opcode
                )));
            }
            tables.command_names.insert(def.name.clone(), def.opcode);
            tables.commands.insert(def.opcode, def);
        }

        for def in tests {
            if tables.test_names.contains_key(&def.name) {
                return Err(Error::InvalidTables(format!(
                    "duplicate test name '{}'",
                    def.name
                )));
            }
            if tables.tests.contains_key(&def.opcode) {
                return Err(Error::InvalidTables(format!(
                    "duplicate test opcode {:#04x}",
                    def.opcode
                )));
            }
            tables.test_names.insert(def.name.clone(), def.opcode);
            tables.tests.insert(def.opcode, def);
        }

        Ok(tables)
    }

    /// Looks up a command definition by opcode.
    #[must_use]
    pub fn command(&self, opcode: u8) -> Option<&CommandDef> {
        self.commands.get(&opcode)
    }

    /// Looks up a test definition by opcode.
    #[must_use]
    pub fn test(&self, opcode: u8) -> Option<&TestDef> {
        self.tests.get(&opcode)
    }

    /// Looks up a command definition by source-level name.
    #[must_use]
    pub fn command_by_name(&self, name: &str) -> Option<&CommandDef> {
        self.command_names.get(name).and_then(|op| self.commands.get(op))
    }

    /// Looks up a test definition by source-level name.
    #[must_use]
    pub fn test_by_name(&self, name: &str) -> Option<&TestDef> {
        self.test_names.get(name).and_then(|op| self.tests.get(op))
    }

    /// Returns a compact table sufficient for unit tests, examples and benches.
    ///
    /// Real callers supply the full table for their interpreter version; this fixture
    /// covers the vocabulary the engine's own test corpus uses.
    #[must_use]
    pub fn fixture() -> Self {
        fn cmd(opcode: u8, name: &str, args: &[ArgKind]) -> CommandDef {
            CommandDef {
                opcode,
                name: name.to_string(),
                args: args.to_vec(),
            }
        }
        fn test(opcode: u8, name: &str, args: &[ArgKind]) -> TestDef {
            TestDef {
                opcode,
                name: name.to_string(),
                args: args.to_vec(),
                variadic: false,
            }
        }

        use ArgKind::{Flag, IObj, Num, Var, Word};

        let commands = vec![
            cmd(0x00, "return", &[]),
            cmd(0x01, "increment", &[Var]),
            cmd(0x02, "decrement", &[Var]),
            cmd(0x03, "assignn", &[Var, Num]),
            cmd(0x04, "assignv", &[Var, Var]),
            cmd(0x05, "addn", &[Var, Num]),
            cmd(0x0c, "set", &[Flag]),
            cmd(0x0d, "reset", &[Flag]),
            cmd(0x12, "new.room", &[Num]),
            cmd(0x66, "printv", &[Var]),
        ];

        let tests = vec![
            test(0x01, "equaln", &[Var, Num]),
            test(0x02, "equalv", &[Var, Var]),
            test(0x03, "lessn", &[Var, Num]),
            test(0x04, "lessv", &[Var, Var]),
            test(0x05, "greatern", &[Var, Num]),
            test(0x06, "greaterv", &[Var, Var]),
            test(0x07, "isset", &[Flag]),
            test(0x09, "has", &[IObj]),
            TestDef {
                opcode: 0x0e,
                name: "said".to_string(),
                args: vec![Word],
                variadic: true,
            },
        ];

        match CodeTables::new(commands, tests) {
            Ok(tables) => tables,
            // The fixture is static data with no duplicates
            Err(_) => unreachable!("fixture tables are well-formed"),
        }
    }
}
