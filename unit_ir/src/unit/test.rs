use super::*;
use crate::FunctionSig;
use crate::IndexRange;
use crate::Param;
use crate::Target;
use crate::Var;

#[test]
fn add_variable_assigns_slots_in_declaration_order() {
    let mut unit = CompiledUnit::unit("Unit1");

    assert_eq!(0, unit.add_variable("A"));
    assert_eq!(1, unit.add_variable("B"));
    assert_eq!(2, unit.add_interface_variable("C"));

    assert_eq!(Some(1), unit.variable_index("B"));
    assert_eq!(None, unit.variable_index("D"));
    assert_eq!(3, unit.variable_count());
}

#[test]
fn add_variable_is_idempotent() {
    let mut unit = CompiledUnit::unit("Unit1");

    let first = unit.add_variable("Counter");
    unit.add_variable("Other");
    let again = unit.add_variable("Counter");

    assert_eq!(first, again);
    assert_eq!(2, unit.variable_count());
}

#[test]
fn redeclaring_in_interface_exports_existing_slot() {
    let mut unit = CompiledUnit::unit("Unit1");

    let slot = unit.add_variable("Counter");
    assert_eq!(Visibility::Implementation, unit.variable("Counter").unwrap().visibility);

    assert_eq!(slot, unit.add_interface_variable("Counter"));
    assert_eq!(Visibility::Interface, unit.variable("Counter").unwrap().visibility);

    // an implementation redeclaration doesn't hide it again
    unit.add_variable("Counter");
    assert_eq!(Visibility::Interface, unit.variable("Counter").unwrap().visibility);
}

#[test]
fn define_label_records_end_of_active_stream() {
    let mut unit = CompiledUnit::unit("Unit1");
    unit.emit(Instruction::Nop);
    unit.emit(Instruction::Nop);

    let at = unit.define_label("L").unwrap();
    assert_eq!(CodeOffset { section: Section::Body, offset: 2 }, at);

    unit.begin_section(Section::Init);
    let init_at = unit.define_label("InitStart").unwrap();
    assert_eq!(CodeOffset { section: Section::Init, offset: 0 }, init_at);

    assert_eq!(Some(at), unit.label("L"));
}

#[test]
fn define_label_twice_fails() {
    let mut unit = CompiledUnit::unit("Unit1");
    unit.define_label("L").unwrap();
    unit.emit(Instruction::jump_to_label("L"));

    let err = unit.define_label("L").unwrap_err();
    match err {
        UnitError::DuplicateLabel { unit: unit_name, label, existing } => {
            assert_eq!("Unit1", unit_name);
            assert_eq!("L", label);
            assert_eq!(0, existing.offset);
        }
        other => panic!("expected duplicate label, got {:?}", other),
    }

    // the original definition is untouched
    assert_eq!(0, unit.label("L").unwrap().offset);
}

#[test]
fn labels_are_unique_across_sections() {
    let mut unit = CompiledUnit::unit("Unit1");
    unit.define_label("L").unwrap();

    unit.begin_section(Section::Final);
    assert!(unit.define_label("L").is_err());
}

#[test]
fn streams_track_offsets_independently() {
    let mut unit = CompiledUnit::unit("Unit1");

    assert_eq!(0, unit.emit(Instruction::Nop));
    assert_eq!(1, unit.emit(Instruction::Return));
    assert_eq!(2, unit.current_offset());

    unit.begin_section(Section::Init);
    assert_eq!(0, unit.current_offset());
    assert_eq!(0, unit.emit(Instruction::Store(Var::Slot(0))));

    assert_eq!(0, unit.emit_finalization(Instruction::Halt));
    assert_eq!(1, unit.current_offset());

    assert_eq!(2, unit.body().len());
    assert_eq!(1, unit.init().len());
    assert_eq!(&[Instruction::Halt], unit.finalization());
}

#[test]
fn begin_function_uses_body_offset() {
    let mut unit = CompiledUnit::unit("Unit1");
    unit.emit(Instruction::Return);

    // emitting into another section first doesn't move the body offset
    unit.begin_section(Section::Init);
    unit.emit(Instruction::Nop);
    unit.emit(Instruction::Nop);

    let sig = FunctionSig::function([Param::new("N", "Integer")], "Integer");
    let decl = unit
        .begin_function("Fact", FunctionDecl::new(sig, Visibility::Interface))
        .unwrap();

    assert_eq!(1, decl.entry);
    assert_eq!(1, decl.locals);
    assert!(unit.exported_function("Fact").is_some());
}

#[test]
fn declare_function_twice_fails() {
    let mut unit = CompiledUnit::unit("Unit1");
    let decl = FunctionDecl::new(FunctionSig::procedure(Vec::<Param>::new()), Visibility::Implementation);

    unit.declare_function("P", decl.clone()).unwrap();
    let err = unit.declare_function("P", decl).unwrap_err();

    assert_eq!(
        UnitError::DuplicateFunction {
            unit: "Unit1".to_string(),
            name: "P".to_string()
        },
        err
    );
}

#[test]
fn private_functions_are_not_exported() {
    let mut unit = CompiledUnit::unit("Unit1");
    let sig = FunctionSig::procedure([Param::by_ref("X", "Integer")]);
    unit.declare_function("Helper", FunctionDecl::new(sig, Visibility::Implementation))
        .unwrap();

    assert!(unit.function("Helper").is_some());
    assert!(unit.exported_function("Helper").is_none());
}

#[test]
fn used_units_keep_order_without_duplicates() {
    let mut unit = CompiledUnit::unit("Unit3");

    assert!(unit.add_used_unit("Unit2"));
    assert!(unit.add_used_unit("Unit1"));
    assert!(!unit.add_used_unit("Unit2"));

    let uses: Vec<_> = unit.used_units().collect();
    assert_eq!(vec!["Unit2", "Unit1"], uses);
    assert!(unit.uses("Unit1"));
    assert!(!unit.uses("Unit3"));
}

#[test]
fn type_names_are_shared_between_tables() {
    let mut unit = CompiledUnit::unit("Shapes");

    unit.add_enum_type("TKind", EnumType::new(["Circle", "Square"])).unwrap();
    unit.add_array_type("TGrid", ArrayInfo::new([IndexRange::new(0, 9)], "TKind")).unwrap();

    let err = unit
        .add_record_type("TKind", RecordType::new([("Radius", "Real")]))
        .unwrap_err();
    assert!(matches!(err, UnitError::DuplicateType { .. }));

    assert_eq!(1, unit.types().enums.len());
    assert_eq!(1, unit.types().arrays.len());
    assert!(unit.types().records.is_empty());
}

#[test]
fn display_lists_every_section() {
    let mut unit = CompiledUnit::unit("Unit1");
    unit.add_variable("X");
    unit.emit(Instruction::Jump(Target::Label("L".to_string())));
    unit.define_label("L").unwrap();

    let text = unit.to_string();
    assert!(text.starts_with("unit Unit1\n"));
    assert!(text.contains("0: X (implementation)"));
    assert!(text.contains("L: body+1"));
    assert!(text.contains("* initialization:"));
    assert!(text.contains("* finalization:"));
}
