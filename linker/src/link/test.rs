use super::*;
use common::span::Location;
use common::span::Span;
use common::DiagnosticOutput;
use test_log::test;
use unit_ir::FunctionDecl;
use unit_ir::FunctionSig;
use unit_ir::Param;
use unit_ir::UnitError;
use unit_ir::Visibility;

fn opts() -> LinkOptions {
    LinkOptions::default()
}

fn procedure(unit: &mut CompiledUnit, name: &str, visibility: Visibility) {
    let sig = FunctionSig::procedure(Vec::<Param>::new());
    unit.begin_function(name, FunctionDecl::new(sig, visibility))
        .unwrap();
    unit.emit(Instruction::Enter { depth: 1, locals: 0 });
    unit.emit(Instruction::Leave);
    unit.emit(Instruction::Return);
}

#[test]
fn slots_are_offset_by_unit_base() {
    let mut unit1 = CompiledUnit::unit("Unit1");
    unit1.add_variable("A");
    unit1.add_variable("B");

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Unit1");
    let x = program.add_variable("X");
    program.begin_section(Section::Init);
    program.emit(Instruction::Load(Var::Slot(x)));
    program.emit(Instruction::Halt);

    let linked = link(vec![unit1], program, &opts()).unwrap();

    assert_eq!(3, linked.globals.len());
    assert_eq!(Some(2), linked.global_slot("Main", "X"));

    // unit1: empty body, init is just the return, fini is just the return
    assert_eq!(0, linked.unit("Unit1").unwrap().init);
    assert_eq!(1, linked.unit("Unit1").unwrap().fini);
    assert_eq!(2, linked.main);
    assert_eq!(Instruction::Load(Var::Global(2)), linked.instructions[2]);
}

#[test]
fn labels_and_offsets_become_absolute() {
    let mut unit1 = CompiledUnit::unit("Unit1");
    unit1.emit(Instruction::Nop);

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Unit1");
    program.begin_section(Section::Init);
    program.define_label("Top").unwrap();
    program.emit(Instruction::Push(true.into()));
    program.emit(Instruction::JumpIfNot(Target::Label("Done".to_string())));
    program.emit(Instruction::Jump(Target::Offset(0)));
    program.define_label("Done").unwrap();

    let linked = link(vec![unit1], program, &opts()).unwrap();

    // Unit1: nop, ret, ret
    let main = linked.main;
    assert_eq!(3, main);
    assert_eq!(
        Instruction::JumpIfNot(Target::Address(main + 3)),
        linked.instructions[main + 1]
    );
    assert_eq!(Instruction::Jump(Target::Address(main)), linked.instructions[main + 2]);

    // "Done" is the end of the main block, which is the appended return
    assert_eq!(Instruction::Return, linked.instructions[main + 3]);
    assert!(linked.is_fully_linked());
}

#[test]
fn labels_in_other_sections_resolve_to_that_section() {
    let mut program = CompiledUnit::program("Main");
    procedure(&mut program, "P", Visibility::Implementation);
    program.begin_section(Section::Final);
    program.define_label("Cleanup").unwrap();
    program.emit(Instruction::Nop);

    program.begin_section(Section::Init);
    program.emit(Instruction::jump_to_label("Cleanup"));

    let linked = link(Vec::new(), program, &opts()).unwrap();
    let map = linked.unit("Main").unwrap();

    assert_eq!(
        Instruction::Jump(Target::Address(map.fini)),
        linked.instructions[map.init]
    );
}

#[test]
fn own_functions_resolve_before_used_units() {
    let mut unit1 = CompiledUnit::unit("Unit1");
    procedure(&mut unit1, "Log", Visibility::Interface);

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Unit1");
    procedure(&mut program, "Log", Visibility::Implementation);
    program.begin_section(Section::Init);
    program.emit(Instruction::call("Log", 0));
    program.emit(Instruction::Call {
        callee: Callee::qualified("Unit1", "Log"),
        arg_count: 0,
    });

    let linked = link(vec![unit1], program, &opts()).unwrap();

    let own = linked.function_address("Main", "Log").unwrap();
    let used = linked.function_address("Unit1", "Log").unwrap();
    assert_ne!(own, used);

    let main = linked.main;
    assert_eq!(
        Instruction::Call { callee: Callee::Address(own), arg_count: 0 },
        linked.instructions[main]
    );
    assert_eq!(
        Instruction::Call { callee: Callee::Address(used), arg_count: 0 },
        linked.instructions[main + 1]
    );
}

#[test]
fn ambiguous_export_is_an_error() {
    let mut left = CompiledUnit::unit("Left");
    left.add_interface_variable("Count");
    let mut right = CompiledUnit::unit("Right");
    right.add_interface_variable("Count");

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Left");
    program.add_used_unit("Right");
    program.begin_section(Section::Init);
    program.emit(Instruction::Load(Var::named("Count")));

    let err = link(vec![left.clone(), right.clone()], program, &opts()).unwrap_err();
    match err {
        LinkError::DuplicateExport { symbol, kind, exporters, .. } => {
            assert_eq!("Count", symbol);
            assert_eq!(SymbolKind::Variable, kind);
            assert_eq!(vec!["Left", "Right"], exporters);
        }
        other => panic!("expected duplicate export, got {:?}", other),
    }

    // qualifying the name resolves the ambiguity
    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Left");
    program.add_used_unit("Right");
    program.begin_section(Section::Init);
    program.emit(Instruction::Load(Var::qualified("Right", "Count")));

    let linked = link(vec![left, right], program, &opts()).unwrap();
    assert_eq!(Instruction::Load(Var::Global(1)), linked.instructions[linked.main]);
}

#[test]
fn implementation_symbols_are_not_visible() {
    let mut unit1 = CompiledUnit::unit("Unit1");
    unit1.add_variable("Secret");
    procedure(&mut unit1, "Helper", Visibility::Implementation);

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Unit1");
    program.begin_section(Section::Init);
    program.emit(Instruction::call("Helper", 0));

    let err = link(vec![unit1.clone()], program, &opts()).unwrap_err();
    assert_eq!(
        LinkError::UnresolvedSymbol {
            unit: "Main".to_string(),
            symbol: "Helper".to_string(),
            kind: SymbolKind::Function,
        },
        err
    );

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Unit1");
    program.begin_section(Section::Init);
    program.emit(Instruction::Store(Var::qualified("Unit1", "Secret")));

    let err = link(vec![unit1], program, &opts()).unwrap_err();
    assert!(matches!(err, LinkError::UnresolvedSymbol { ref symbol, .. } if symbol == "Unit1.Secret"));
}

#[test]
fn exports_of_indirect_dependencies_are_not_visible() {
    let mut base = CompiledUnit::unit("Base");
    base.add_interface_variable("Shared");

    let mut middle = CompiledUnit::unit("Middle");
    middle.add_used_unit("Base");

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Middle");
    program.begin_section(Section::Init);
    program.emit(Instruction::Load(Var::named("Shared")));

    let err = link(vec![base.clone(), middle.clone()], program, &opts()).unwrap_err();
    assert!(matches!(err, LinkError::UnresolvedSymbol { .. }));

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Middle");
    program.begin_section(Section::Init);
    program.emit(Instruction::Load(Var::qualified("Base", "Shared")));

    let err = link(vec![base, middle], program, &opts()).unwrap_err();
    assert_eq!(
        LinkError::UnitNotUsed {
            unit: "Main".to_string(),
            used_unit: "Base".to_string(),
            symbol: "Shared".to_string(),
        },
        err
    );
}

#[test]
fn frame_references_are_untouched() {
    let mut program = CompiledUnit::program("Main");
    let sig = FunctionSig::procedure([Param::new("N", "Integer")]);
    program
        .begin_function("Outer", FunctionDecl::new(sig, Visibility::Implementation))
        .unwrap();
    program.emit(Instruction::Enter { depth: 1, locals: 1 });
    program.emit(Instruction::Load(Var::frame(0, 0)));
    program.emit(Instruction::Store(Var::frame(1, 0)));
    program.emit(Instruction::Leave);
    program.emit(Instruction::Return);

    let linked = link(Vec::new(), program, &opts()).unwrap();

    assert_eq!(Instruction::Load(Var::frame(0, 0)), linked.instructions[1]);
    assert_eq!(Instruction::Store(Var::frame(1, 0)), linked.instructions[2]);

    let outer = &linked.unit("Main").unwrap().functions["Outer"];
    assert_eq!(1, outer.depth);
    assert_eq!(1, outer.locals);
}

#[test]
fn undefined_label_is_an_error() {
    let mut program = CompiledUnit::program("Main");
    program.emit(Instruction::jump_to_label("Nowhere"));

    let err = link(Vec::new(), program, &opts()).unwrap_err();
    assert_eq!(
        LinkError::UndefinedLabel {
            unit: "Main".to_string(),
            label: "Nowhere".to_string(),
        },
        err
    );
}

#[test]
fn offsets_past_end_of_section_are_errors() {
    let mut program = CompiledUnit::program("Main");
    program.begin_section(Section::Init);
    program.emit(Instruction::Jump(Target::Offset(5)));

    let err = link(Vec::new(), program, &opts()).unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidOffset { section: Section::Init, offset: 5, len: 1, .. }
    ));
}

#[test]
fn body_end_is_not_a_jump_target() {
    let mut unit = CompiledUnit::unit("U");
    unit.emit(Instruction::Nop);
    unit.emit(Instruction::Jump(Target::Offset(2)));
    unit.begin_section(Section::Init);
    unit.emit(Instruction::Halt);

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("U");

    let err = link(vec![unit], program.clone(), &opts()).unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidOffset { section: Section::Body, offset: 2, len: 2, .. }
    ));

    let mut unit = CompiledUnit::unit("U");
    unit.emit(Instruction::Nop);
    unit.emit(Instruction::jump_to_label("End"));
    unit.define_label("End").unwrap();
    unit.begin_section(Section::Init);
    unit.emit(Instruction::Halt);

    let err = link(vec![unit], program, &opts()).unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidOffset { section: Section::Body, offset: 2, len: 2, .. }
    ));
}

#[test]
fn last_body_instruction_is_a_jump_target() {
    let mut unit = CompiledUnit::unit("U");
    unit.emit(Instruction::Jump(Target::Offset(1)));
    unit.emit(Instruction::Nop);

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("U");

    let linked = link(vec![unit], program, &opts()).unwrap();
    let map = linked.unit("U").unwrap();
    assert_eq!(
        Instruction::Jump(Target::Address(map.body.start + 1)),
        linked.instructions[map.body.start]
    );
}

#[test]
fn slot_out_of_range_is_an_error() {
    let mut program = CompiledUnit::program("Main");
    program.add_variable("Only");
    program.emit(Instruction::Load(Var::Slot(1)));

    let err = link(Vec::new(), program, &opts()).unwrap_err();
    assert!(matches!(err, LinkError::SlotOutOfRange { slot: 1, count: 1, .. }));
}

#[test]
fn function_entry_past_body_is_an_error() {
    let mut program = CompiledUnit::program("Main");
    let decl = FunctionDecl::new(FunctionSig::procedure(Vec::<Param>::new()), Visibility::Implementation);
    program.begin_function("Empty", decl).unwrap();

    let err = link(Vec::new(), program, &opts()).unwrap_err();
    assert!(matches!(err, LinkError::InvalidEntry { entry: 0, len: 0, .. }));
}

#[test]
fn function_entry_error_points_at_declaration() {
    let decl_span = Span::new("Main.pas", Location::new(3, 0), Location::new(3, 14));

    let mut program = CompiledUnit::program("Main");
    let decl = FunctionDecl::new(FunctionSig::procedure(Vec::<Param>::new()), Visibility::Implementation)
        .with_span(decl_span.clone());
    program.begin_function("Empty", decl).unwrap();

    let err = link(Vec::new(), program, &opts()).unwrap_err();
    let label = err.main().label.unwrap();
    assert_eq!(decl_span, label.span);
    assert_eq!(Some("function declared here"), label.text.as_deref());
}

#[test]
fn global_limit_is_enforced() {
    let mut unit1 = CompiledUnit::unit("Unit1");
    unit1.add_variable("A");
    unit1.add_variable("B");

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Unit1");
    program.add_variable("C");

    let opts = LinkOptions {
        max_globals: 2,
        ..LinkOptions::default()
    };

    let err = link(vec![unit1], program, &opts).unwrap_err();
    assert!(matches!(
        err,
        LinkError::AddressSpaceOverflow {
            space: AddressSpaceKind::Globals,
            used: 2,
            requested: 1,
            limit: 2,
            ..
        }
    ));
}

#[test]
fn instruction_limit_is_enforced() {
    let mut program = CompiledUnit::program("Main");
    program.begin_section(Section::Init);
    program.emit(Instruction::Nop);

    // main block plus return, final block return
    let opts = LinkOptions {
        max_instructions: 2,
        ..LinkOptions::default()
    };

    let err = link(Vec::new(), program, &opts).unwrap_err();
    assert!(matches!(
        err,
        LinkError::AddressSpaceOverflow { space: AddressSpaceKind::Code, requested: 3, .. }
    ));
}

#[test]
fn duplicate_label_from_front_end_converts() {
    let mut unit = CompiledUnit::unit("Unit1");
    unit.define_label("L").unwrap();

    let err: LinkError = unit.define_label("L").unwrap_err().into();
    assert!(matches!(err, LinkError::Unit(UnitError::DuplicateLabel { .. })));
    assert_eq!("label `L` is already defined in `Unit1`", err.to_string());
}

#[test]
fn stripped_units_are_not_linked() {
    let mut unused = CompiledUnit::unit("Unused");
    unused.add_variable("Waste");
    let mut used = CompiledUnit::unit("Used");
    used.add_variable("Kept");

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Used");

    let opts = LinkOptions {
        strip_unused: true,
        ..LinkOptions::default()
    };

    let linked = link(vec![unused, used], program, &opts).unwrap();
    assert!(linked.unit("Unused").is_none());
    assert_eq!(Some(0), linked.global_slot("Used", "Kept"));

    let init: Vec<_> = linked.init_order.iter().map(|e| e.unit.as_str()).collect();
    assert_eq!(vec!["Used", "Main"], init);
}

#[test]
fn listing_names_globals_and_functions() {
    let mut unit1 = CompiledUnit::unit("Unit1");
    unit1.add_interface_variable("Total");
    procedure(&mut unit1, "Reset", Visibility::Interface);

    let mut program = CompiledUnit::program("Main");
    program.add_used_unit("Unit1");
    program.begin_section(Section::Init);
    program.emit(Instruction::call("Reset", 0));
    program.emit(Instruction::Load(Var::named("Total")));

    let linked = link(vec![unit1], program, &opts()).unwrap();
    let listing = linked.to_string();

    assert!(listing.contains("0: Unit1.Total"), "{}", listing);
    assert!(listing.contains("call @0 (Unit1.Reset)/0"), "{}", listing);
    assert!(listing.contains("load G0 (Unit1.Total)"), "{}", listing);
    assert!(listing.contains("* program Main initialization:"), "{}", listing);

    let map = linked.link_map().to_string();
    assert!(map.contains("init order: Unit1, Main"), "{}", map);
    assert!(map.contains("final order: Main, Unit1"), "{}", map);
}
