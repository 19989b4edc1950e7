//! Tests for the verify -> optimize -> verify pipeline.

mod common;

use inkwell::context::Context;
use inkwell::module::Module;
use ptxc::core::{CompileError, OptLevel, PipelineError, VerifyPhase};
use ptxc::llvm::{
    emit_assembly, link_needed, optimize, run_pipeline, OptimizationConfig, ResolvedTarget, TargetHint,
    TargetRegistry,
};

use common::{external_names, parse_ir, write_file, DEVICE_LIBRARY, LIBRARY_KERNEL, PLAIN_KERNEL};

/// Resolve and bind the NVPTX target for `module`.
fn bind_target(module: &Module<'_>, level: OptLevel) -> ResolvedTarget {
    let registry = TargetRegistry::initialize();
    let hint = TargetHint::peek(module);
    let target = ResolvedTarget::resolve(&registry, &hint, "", "", level).unwrap();
    target.bind(module, &hint);
    target
}

#[test]
fn level_zero_preserves_external_names() {
    common::init_logging();
    let context = Context::create();
    let module = parse_ir(&context, "plain", PLAIN_KERNEL);
    let target = bind_target(&module, OptLevel::O0);

    let before = external_names(&module);
    optimize(&module, target.machine(), &OptimizationConfig::default()).unwrap();
    assert_eq!(external_names(&module), before);
}

#[test]
fn level_zero_preserves_names_after_linking() {
    let dir = tempfile::tempdir().unwrap();
    let library = write_file(dir.path(), "libdevice.ll", DEVICE_LIBRARY);

    let context = Context::create();
    let module = parse_ir(&context, "kernel", LIBRARY_KERNEL);
    let target = bind_target(&module, OptLevel::O0);
    link_needed(&module, &[&library]).unwrap();

    let before = external_names(&module);
    let config = OptimizationConfig::new(OptLevel::O0, 1100);
    optimize(&module, target.machine(), &config).unwrap();
    assert_eq!(external_names(&module), before);
}

#[test]
fn optimized_modules_still_verify() {
    let dir = tempfile::tempdir().unwrap();
    let library = write_file(dir.path(), "libdevice.ll", DEVICE_LIBRARY);

    for level in [OptLevel::O1, OptLevel::O2, OptLevel::O3] {
        let context = Context::create();
        let module = parse_ir(&context, "kernel", LIBRARY_KERNEL);
        let target = bind_target(&module, level);
        link_needed(&module, &[&library]).unwrap();

        let config = OptimizationConfig::new(level, 1100);
        optimize(&module, target.machine(), &config)
            .unwrap_or_else(|e| panic!("{level}: {e}"));

        module.verify().unwrap();
        assert!(module.get_function("apply").is_some(), "{level} dropped apply");
    }
}

#[test]
fn higher_levels_remove_internalized_library_code() {
    let dir = tempfile::tempdir().unwrap();
    let library = write_file(dir.path(), "libdevice.ll", DEVICE_LIBRARY);

    let context = Context::create();
    let module = parse_ir(&context, "kernel", LIBRARY_KERNEL);
    let target = bind_target(&module, OptLevel::O2);
    link_needed(&module, &[&library]).unwrap();

    optimize(&module, target.machine(), &OptimizationConfig::new(OptLevel::O2, 1100)).unwrap();
    assert!(module.get_function("__nv_helper").is_none());
    assert!(module.get_function("__nv_fast").is_none());
}

#[test]
fn invalid_module_fails_before_optimization() {
    let context = Context::create();
    let module = context.create_module("broken");
    let fn_type = context.void_type().fn_type(&[], false);
    let function = module.add_function("no_terminator", fn_type, None);
    context.append_basic_block(function, "entry");

    let target = bind_target(&module, OptLevel::O2);
    let err = optimize(&module, target.machine(), &OptimizationConfig::new(OptLevel::O2, 1100))
        .unwrap_err();

    match err {
        CompileError::Verify(verify) => assert_eq!(verify.phase, VerifyPhase::BeforeOptimization),
        other => panic!("expected verification error, got {other}"),
    }
}

#[test]
fn unknown_pass_is_reported() {
    let context = Context::create();
    let module = parse_ir(&context, "plain", PLAIN_KERNEL);

    let err = run_pipeline(&module, None, "definitely-not-a-pass").unwrap_err();
    assert!(matches!(err, PipelineError::PassesFailed { .. }));
}

#[test]
fn target_binding_sets_triple_and_layout() {
    let context = Context::create();
    let module = context.create_module("bare");
    let target = bind_target(&module, OptLevel::O0);

    assert_eq!(target.triple(), "nvptx64-unknown-unknown");
    assert_eq!(module.get_triple().as_str().to_str().unwrap(), target.triple());
    assert_eq!(
        module.get_data_layout().as_str().to_str().unwrap(),
        target.data_layout()
    );
}

#[test]
fn emission_uses_bound_triple() {
    let context = Context::create();
    let module = parse_ir(&context, "plain", PLAIN_KERNEL);
    let target = bind_target(&module, OptLevel::O0);
    optimize(&module, target.machine(), &OptimizationConfig::default()).unwrap();

    assert_eq!(
        module.get_triple().as_str().to_str().unwrap(),
        target.machine().get_triple().as_str().to_str().unwrap()
    );
    let ptx = emit_assembly(module, target.machine()).unwrap();
    assert!(ptx.contains(".address_size 64"));
    assert!(ptx.contains(".visible .func"));
}
