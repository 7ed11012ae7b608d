//! Behavior-preservation round trips over a curated corpus.
//!
//! Round-tripping is contractual only up to externally observable behavior: the
//! order of command executions and test evaluations under a reference interpreter
//! must survive compile→decompile→compile, byte- and text-identity need not. The
//! reference interpreter below executes the fixture vocabulary directly over the
//! instruction stream, tracing every command and every test evaluation.

use logicscript::prelude::*;

// ---------------------------------------------------------------------------
// Reference interpreter
// ---------------------------------------------------------------------------

/// One observable event during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Command(u8, Vec<u16>),
    Test(u8, Vec<u16>, bool),
}

/// Minimal interpreter for the fixture tables; opcode 0x00 (`return`) halts.
struct Evaluator<'a> {
    instructions: &'a [Instruction],
    vars: [u8; 256],
    flags: [bool; 256],
    trace: Vec<Event>,
}

impl<'a> Evaluator<'a> {
    fn new(instructions: &'a [Instruction]) -> Self {
        Evaluator {
            instructions,
            vars: [0; 256],
            flags: [false; 256],
            trace: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Event> {
        let mut pc = 0usize;
        let mut steps = 0usize;
        while pc < self.instructions.len() {
            steps += 1;
            assert!(steps < 10_000, "reference interpreter ran away");

            match self.instructions[pc].kind.clone() {
                InstructionKind::Command(command) => {
                    self.trace
                        .push(Event::Command(command.opcode, command.args.clone()));
                    if command.opcode == 0x00 {
                        break; // return
                    }
                    self.execute(&command);
                    pc += 1;
                }
                InstructionKind::Goto { target } => match self.index_of(target) {
                    Some(index) => pc = index,
                    None => break, // jump off the end
                },
                InstructionKind::Condition { clauses, skip_to } => {
                    if self.evaluate(&clauses) {
                        pc += 1;
                    } else {
                        match self.index_of(skip_to) {
                            Some(index) => pc = index,
                            None => break,
                        }
                    }
                }
            }
        }
        self.trace
    }

    fn index_of(&self, address: Address) -> Option<usize> {
        self.instructions.iter().position(|i| i.address == address)
    }

    fn execute(&mut self, command: &Command) {
        let var = |index: u16| index as usize;
        match command.opcode {
            0x01 => self.vars[var(command.args[0])] = self.vars[var(command.args[0])].saturating_add(1),
            0x02 => self.vars[var(command.args[0])] = self.vars[var(command.args[0])].saturating_sub(1),
            0x03 => self.vars[var(command.args[0])] = command.args[1] as u8,
            0x04 => self.vars[var(command.args[0])] = self.vars[var(command.args[1])],
            0x05 => {
                self.vars[var(command.args[0])] =
                    self.vars[var(command.args[0])].wrapping_add(command.args[1] as u8);
            }
            0x0c => self.flags[var(command.args[0])] = true,
            0x0d => self.flags[var(command.args[0])] = false,
            // printv, new.room and anything else: observable only through the trace
            _ => {}
        }
    }

    fn evaluate(&mut self, clauses: &[Clause]) -> bool {
        // Implicit AND over clauses, short-circuit; OR groups short-circuit too.
        // The trace records the evaluations that actually happen.
        for clause in clauses {
            let holds = match clause {
                Clause::Single(term) => self.evaluate_term(term),
                Clause::Any(terms) => {
                    let mut any = false;
                    for term in terms {
                        if self.evaluate_term(term) {
                            any = true;
                            break;
                        }
                    }
                    any
                }
            };
            if !holds {
                return false;
            }
        }
        true
    }

    fn evaluate_term(&mut self, term: &ClauseTerm) -> bool {
        let args = &term.test.args;
        let var = |index: u16| index as usize;
        let result = match term.test.opcode {
            0x01 => self.vars[var(args[0])] == args[1] as u8,
            0x02 => self.vars[var(args[0])] == self.vars[var(args[1])],
            0x03 => self.vars[var(args[0])] < args[1] as u8,
            0x04 => self.vars[var(args[0])] < self.vars[var(args[1])],
            0x05 => self.vars[var(args[0])] > args[1] as u8,
            0x06 => self.vars[var(args[0])] > self.vars[var(args[1])],
            0x07 => self.flags[var(args[0])],
            _ => false, // has, said: no world state in the reference interpreter
        };
        self.trace
            .push(Event::Test(term.test.opcode, args.clone(), result));
        result != term.negated
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn compile_ok(source: &[Stmt], tables: &CodeTables) -> Vec<Instruction> {
    let mut diagnostics = Diagnostics::new();
    let compiled = compile(source, tables, &mut diagnostics).unwrap();
    assert!(
        !diagnostics.has_errors(),
        "unexpected diagnostics: {diagnostics:?}"
    );
    compiled.expect("compilation produced no output")
}

fn decompile_ok(instructions: &[Instruction], tables: &CodeTables) -> Vec<Stmt> {
    let mut diagnostics = Diagnostics::new();
    let statements = decompile(instructions, tables, &mut diagnostics).unwrap();
    assert!(
        !diagnostics.has_errors(),
        "unexpected diagnostics: {diagnostics:?}"
    );
    statements
}

/// Asserts the full compile→decompile→compile round trip preserves the observable
/// trace, and that the decompiled source never references a missing label.
fn assert_roundtrip(source: &[Stmt]) {
    let tables = CodeTables::fixture();

    let first = compile_ok(source, &tables);
    let original_trace = Evaluator::new(&first).run();

    let recovered = decompile_ok(&first, &tables);
    assert_goto_labels_closed(&recovered);

    let second = compile_ok(&recovered, &tables);
    let roundtrip_trace = Evaluator::new(&second).run();

    assert_eq!(
        original_trace, roundtrip_trace,
        "observable behavior changed across the round trip\nsource: {source:#?}\nrecovered: {recovered:#?}"
    );
}

/// Every goto target in the output must have a matching label in the same output.
fn assert_goto_labels_closed(statements: &[Stmt]) {
    fn walk(statements: &[Stmt], labels: &mut Vec<String>, gotos: &mut Vec<String>) {
        for statement in statements {
            match statement {
                Stmt::Label(name) => labels.push(name.clone()),
                Stmt::Goto(name) => gotos.push(name.clone()),
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    walk(then_body, labels, gotos);
                    walk(else_body, labels, gotos);
                }
                Stmt::Command(_) => {}
            }
        }
    }
    let mut labels = Vec::new();
    let mut gotos = Vec::new();
    walk(statements, &mut labels, &mut gotos);
    for goto in &gotos {
        assert!(
            labels.contains(goto),
            "decompiled output contains goto {goto} without its label"
        );
    }
}

// ---------------------------------------------------------------------------
// Curated corpus
// ---------------------------------------------------------------------------

#[test]
fn straight_line() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 5]),
        Stmt::command("increment", vec![1]),
        Stmt::command("printv", vec![1]),
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn if_with_else() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 3]),
        Stmt::If {
            condition: BooleanExpression::test("equaln", vec![1, 3]),
            then_body: vec![Stmt::command("increment", vec![1])],
            else_body: vec![Stmt::command("decrement", vec![1])],
        },
        Stmt::command("printv", vec![1]),
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn if_without_else() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 5]),
        Stmt::if_then(
            BooleanExpression::test("equaln", vec![1, 5]),
            vec![Stmt::command("printv", vec![1])],
        ),
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn if_with_untaken_branch() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 4]),
        Stmt::if_then(
            BooleanExpression::test("equaln", vec![1, 5]),
            vec![Stmt::command("printv", vec![1])],
        ),
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn nested_if() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 5]),
        Stmt::command("set", vec![2]),
        Stmt::If {
            condition: BooleanExpression::test("equaln", vec![1, 5]),
            then_body: vec![
                Stmt::command("increment", vec![1]),
                Stmt::If {
                    condition: BooleanExpression::test("isset", vec![2]),
                    then_body: vec![Stmt::command("printv", vec![1])],
                    else_body: vec![Stmt::command("decrement", vec![1])],
                },
            ],
            else_body: vec![Stmt::command("reset", vec![2])],
        },
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn backward_goto_loop() {
    // Counts v1 from 0 to 3, then exits
    assert_roundtrip(&[
        Stmt::Label("again".to_string()),
        Stmt::command("increment", vec![1]),
        Stmt::if_then(
            BooleanExpression::not(BooleanExpression::test("equaln", vec![1, 3])),
            vec![Stmt::Goto("again".to_string())],
        ),
        Stmt::command("printv", vec![1]),
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn forward_early_exit_goto() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 9]),
        Stmt::if_then(
            BooleanExpression::test("equaln", vec![1, 9]),
            vec![Stmt::Goto("out".to_string())],
        ),
        Stmt::command("increment", vec![1]),
        Stmt::command("printv", vec![1]),
        Stmt::Label("out".to_string()),
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn then_branch_ending_in_return() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 1]),
        Stmt::if_then(
            BooleanExpression::test("equaln", vec![1, 1]),
            vec![
                Stmt::command("printv", vec![1]),
                Stmt::command("return", vec![]),
            ],
        ),
        Stmt::command("increment", vec![1]),
        Stmt::command("return", vec![]),
    ]);
}

#[test]
fn or_condition_roundtrip() {
    assert_roundtrip(&[
        Stmt::command("assignn", vec![1, 5]),
        Stmt::if_then(
            BooleanExpression::Or(vec![
                BooleanExpression::comparison(
                    ComparisonOp::Lt,
                    ComparisonOperand::Var(1),
                    ComparisonOperand::Num(5),
                ),
                BooleanExpression::comparison(
                    ComparisonOp::Eq,
                    ComparisonOperand::Var(1),
                    ComparisonOperand::Num(5),
                ),
            ]),
            vec![Stmt::command("printv", vec![1])],
        ),
        Stmt::command("return", vec![]),
    ]);
}

// ---------------------------------------------------------------------------
// Shape properties
// ---------------------------------------------------------------------------

#[test]
fn skip_address_lands_after_then_body() {
    let tables = CodeTables::fixture();
    let source = vec![
        Stmt::command("assignn", vec![1, 5]),
        Stmt::if_then(
            BooleanExpression::comparison(
                ComparisonOp::Eq,
                ComparisonOperand::Var(1),
                ComparisonOperand::Num(5),
            ),
            vec![Stmt::command("printv", vec![1])],
        ),
        Stmt::command("return", vec![]),
    ];
    let compiled = compile_ok(&source, &tables);

    // No else branch is emitted at all
    assert!(compiled
        .iter()
        .all(|i| !matches!(i.kind, InstructionKind::Goto { .. })));

    // The skip lands exactly after the printv call
    let printv = compiled
        .iter()
        .position(|i| matches!(&i.kind, InstructionKind::Command(c) if c.opcode == 0x66))
        .unwrap();
    let InstructionKind::Condition { skip_to, .. } = &compiled[printv - 1].kind else {
        panic!("expected the condition right before printv");
    };
    assert_eq!(*skip_to, compiled[printv + 1].address);

    // And the decompilation is an if with an empty else, not a dangling goto
    let recovered = decompile_ok(&compiled, &tables);
    let shape: Vec<bool> = recovered
        .iter()
        .map(|s| matches!(s, Stmt::Goto(_) | Stmt::Label(_)))
        .collect();
    assert!(shape.iter().all(|is_jump| !is_jump), "dangling jump: {recovered:#?}");
    let Stmt::If { else_body, .. } = &recovered[1] else {
        panic!("expected if, got {:?}", recovered[1]);
    };
    assert!(else_body.is_empty());
}

#[test]
fn trailing_code_not_duplicated() {
    let tables = CodeTables::fixture();
    let source = vec![
        Stmt::if_then(
            BooleanExpression::test("isset", vec![1]),
            vec![
                Stmt::command("increment", vec![1]),
                Stmt::command("return", vec![]),
            ],
        ),
        Stmt::command("decrement", vec![1]),
        Stmt::command("printv", vec![1]),
        Stmt::command("return", vec![]),
    ];

    let compiled = compile_ok(&source, &tables);
    let recovered = decompile_ok(&compiled, &tables);

    // The trailing code appears exactly once, outside the if
    fn count(statements: &[Stmt], opcode_name: &str) -> usize {
        statements
            .iter()
            .map(|s| match s {
                Stmt::Command(call) if call.name == opcode_name => 1,
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => count(then_body, opcode_name) + count(else_body, opcode_name),
                _ => 0,
            })
            .sum()
    }
    assert_eq!(count(&recovered, "decrement"), 1);
    assert_eq!(count(&recovered, "printv"), 1);

    // ... and outside the if: the statement after the if is the decrement
    let Stmt::If { else_body, .. } = &recovered[0] else {
        panic!("expected leading if, got {:?}", recovered[0]);
    };
    assert!(else_body.is_empty());
    assert_eq!(recovered[1], Stmt::command("decrement", vec![1]));
}

#[test]
fn less_or_equal_idiom_is_one_clause() {
    let tables = CodeTables::fixture();
    let source = vec![
        Stmt::if_then(
            BooleanExpression::Or(vec![
                BooleanExpression::comparison(
                    ComparisonOp::Lt,
                    ComparisonOperand::Var(1),
                    ComparisonOperand::Num(5),
                ),
                BooleanExpression::comparison(
                    ComparisonOp::Eq,
                    ComparisonOperand::Var(1),
                    ComparisonOperand::Num(5),
                ),
            ]),
            vec![Stmt::command("increment", vec![1])],
        ),
        Stmt::command("return", vec![]),
    ];
    let compiled = compile_ok(&source, &tables);

    let condition = compiled
        .iter()
        .find_map(|i| match &i.kind {
            InstructionKind::Condition { clauses, .. } => Some(clauses),
            _ => None,
        })
        .expect("expected a condition");

    // One OR clause of two tests; never a malformed nesting
    assert_eq!(condition.len(), 1);
    let Clause::Any(terms) = &condition[0] else {
        panic!("expected an OR group, got {condition:?}");
    };
    assert_eq!(terms.len(), 2);
}

#[test]
fn decompiled_bytecode_loop_roundtrip() {
    // Hand-written bytecode: a counting loop, entered without any source text
    let tables = CodeTables::fixture();
    let equaln_clause = |negated| {
        vec![Clause::Single(ClauseTerm {
            negated,
            test: TestCall {
                opcode: 0x01, // equaln
                args: vec![1, 2],
            },
        })]
    };

    let stream = vec![
        Instruction {
            address: 0,
            kind: InstructionKind::Command(Command {
                opcode: 0x01, // increment v1
                args: vec![1],
            }),
        },
        Instruction {
            address: 2,
            kind: InstructionKind::Condition {
                clauses: equaln_clause(true), // !equaln(v1, 2)
                skip_to: 12,
            },
        },
        Instruction {
            address: 10,
            kind: InstructionKind::Goto { target: 0 },
        },
        Instruction {
            address: 12,
            kind: InstructionKind::Command(Command {
                opcode: 0x66, // printv v1
                args: vec![1],
            }),
        },
        Instruction {
            address: 14,
            kind: InstructionKind::Command(Command {
                opcode: 0x00,
                args: vec![],
            }),
        },
    ];

    let original_trace = Evaluator::new(&stream).run();

    let recovered = decompile_ok(&stream, &tables);
    assert_goto_labels_closed(&recovered);
    let recompiled = compile_ok(&recovered, &tables);
    let roundtrip_trace = Evaluator::new(&recompiled).run();

    assert_eq!(original_trace, roundtrip_trace);
}
