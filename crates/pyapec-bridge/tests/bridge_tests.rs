//! Integration tests for the bridge against stub model scripts.
//!
//! Each test writes a small Python module into its own temporary directory and
//! points a bridge at it. Module names are unique per test because imported
//! modules stay cached in `sys.modules` for the life of the test process.

use pretty_assertions::assert_eq;
use pyapec_bridge::{Bridge, BridgeConfig, BridgeError, FailureKind, evaluate};
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn write_module(module: &str, source: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join(format!("{module}.py")), source)
        .expect("Failed to write stub module");
    dir
}

fn stub_config(dir: &TempDir, module: &str, function: &str) -> BridgeConfig {
    BridgeConfig::builder()
        .script_dir(dir.path())
        .module_name(module)
        .function_name(function)
        .support_modules(Vec::<String>::new())
        .build()
        .expect("valid config")
}

/// Loads `source` as `module` and returns a bridge calling `model` in it.
fn stub_bridge(module: &str, source: &str) -> (TempDir, Bridge) {
    let dir = write_module(module, source);
    let bridge = Bridge::try_new(stub_config(&dir, module, "model")).expect("stub should import");
    (dir, bridge)
}

fn assert_bits_eq(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(a.to_bits(), e.to_bits(), "bin {i}: {a} != {e}");
    }
}

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn test_identity_stub_leaves_flux_unchanged() {
    let (_dir, bridge) = stub_bridge(
        "stub_identity",
        r#"
def model(engs, params, flux):
    return flux
"#,
    );

    let original = vec![1.5, -2.25, 3.0e-12];
    let mut flux = original.clone();

    let bins = bridge
        .invoke(&[0.1, 0.2, 0.3, 0.4], &[1.0], &mut flux)
        .unwrap();

    assert_eq!(bins, 3);
    assert_bits_eq(&flux, &original);
}

#[test]
fn test_doubling_stub_is_exact() {
    let (_dir, bridge) = stub_bridge(
        "stub_double",
        r#"
def model(engs, params, flux):
    return [2.0 * x for x in flux]
"#,
    );

    let original = vec![0.1, 1.0e-300, 12345.678_9, -7.5, 1.0 / 3.0];
    let mut flux = original.clone();

    bridge
        .invoke(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[0.5], &mut flux)
        .unwrap();

    let expected: Vec<f64> = original.iter().map(|x| 2.0 * x).collect();
    assert_bits_eq(&flux, &expected);
}

#[test]
fn test_argument_order_is_preserved() {
    let (_dir, bridge) = stub_bridge(
        "stub_order",
        r#"
def model(engs, params, flux):
    return [e * params[0] for e in engs]
"#,
    );

    let mut flux = Vec::new();
    let mut flux_err = Vec::new();
    let bins = evaluate(&bridge, &[1.0, 2.0, 3.0], &[0.1, 0.2], &mut flux, &mut flux_err).unwrap();

    assert_eq!(bins, 2);
    assert_bits_eq(&flux, &[1.0 * 0.1, 2.0 * 0.1]);
}

#[test]
fn test_in_place_update_returning_none() {
    let (_dir, bridge) = stub_bridge(
        "stub_in_place",
        r#"
def model(engs, params, flux):
    flux[:] = [x + params[1] for x in flux]
"#,
    );

    let mut flux = vec![1.0, 2.0];
    bridge.invoke(&[0.0, 1.0, 2.0], &[0.0, 0.5], &mut flux).unwrap();

    assert_eq!(flux, vec![1.5, 2.5]);
}

#[test]
fn test_in_place_update_returning_status_code() {
    let (_dir, bridge) = stub_bridge(
        "stub_in_place_status",
        r#"
def model(engs, params, flux):
    flux[:] = [7.0] * len(flux)
    return 0
"#,
    );

    let mut flux = vec![1.0, 2.0];
    let bins = bridge.invoke(&[0.0, 1.0, 2.0], &[1.0], &mut flux).unwrap();

    assert_eq!(bins, 2);
    assert_eq!(flux, vec![7.0, 7.0]);
}

#[test]
fn test_function_sees_all_three_lists() {
    let (_dir, bridge) = stub_bridge(
        "stub_shapes",
        r#"
def model(engs, params, flux):
    assert isinstance(engs, list) and isinstance(params, list) and isinstance(flux, list)
    return [float(len(engs)), float(len(params)), float(len(flux))]
"#,
    );

    let mut flux = vec![0.0; 3];
    bridge
        .invoke(&[1.0, 2.0, 3.0, 4.0], &[9.0, 8.0], &mut flux)
        .unwrap();

    assert_eq!(flux, vec![4.0, 2.0, 3.0]);
}

// ============================================================================
// Host Entry Point Semantics
// ============================================================================

#[test]
fn test_evaluate_sizes_outputs() {
    let (_dir, bridge) = stub_bridge(
        "stub_sizes",
        r#"
def model(engs, params, flux):
    assert all(x == 0.0 for x in flux)
    return [float(i) for i in range(len(flux))]
"#,
    );

    let mut flux = vec![99.0; 10];
    let mut flux_err = vec![1.0; 10];
    evaluate(&bridge, &[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0], &mut flux, &mut flux_err).unwrap();

    assert_eq!(flux, vec![0.0, 1.0, 2.0, 3.0]);
    assert!(flux_err.is_empty());
}

#[test]
fn test_evaluate_empty_params_leaves_zeroed_bins() {
    let (_dir, bridge) = stub_bridge(
        "stub_empty_params",
        r#"
def model(engs, params, flux):
    return [1.0] * len(flux)
"#,
    );

    let mut flux = vec![5.0];
    let mut flux_err = Vec::new();
    let err = evaluate(&bridge, &[1.0, 2.0, 3.0], &[], &mut flux, &mut flux_err).unwrap_err();

    assert_eq!(err.kind(), FailureKind::EmptyInput);
    assert_eq!(flux, vec![0.0, 0.0]);
}

// ============================================================================
// Failure Isolation
// ============================================================================

#[test]
fn test_empty_inputs_leave_flux_unchanged() {
    let (_dir, bridge) = stub_bridge(
        "stub_empty_inputs",
        r#"
def model(engs, params, flux):
    return [123.0] * len(flux)
"#,
    );

    let mut flux = vec![0.25, 0.5];

    let err = bridge.invoke(&[], &[1.0], &mut flux).unwrap_err();
    assert!(matches!(err, BridgeError::EmptyInput { energies: 0, params: 1 }));

    let err = bridge.invoke(&[1.0, 2.0, 3.0], &[], &mut flux).unwrap_err();
    assert!(matches!(err, BridgeError::EmptyInput { energies: 3, params: 0 }));

    assert_bits_eq(&flux, &[0.25, 0.5]);
}

#[test]
fn test_unknown_function_leaves_flux_unchanged() {
    let module = "stub_unknown_function";
    let dir = write_module(
        module,
        r#"
def model(engs, params, flux):
    return flux
"#,
    );
    let bridge = Bridge::try_new(stub_config(&dir, module, "not_there")).unwrap();

    let mut flux = vec![3.0, 4.0];
    let err = bridge.invoke(&[1.0, 2.0, 3.0], &[1.0], &mut flux).unwrap_err();

    assert_eq!(err.kind(), FailureKind::SymbolResolutionFailure);
    assert!(err.to_string().contains("not_there"));
    assert_eq!(flux, vec![3.0, 4.0]);
}

#[test]
fn test_non_callable_symbol_is_rejected() {
    let (_dir, bridge) = stub_bridge("stub_not_callable", "model = 3.0\n");

    let mut flux = vec![1.0];
    let err = bridge.invoke(&[1.0, 2.0], &[1.0], &mut flux).unwrap_err();

    assert_eq!(err.kind(), FailureKind::SymbolResolutionFailure);
    assert!(err.to_string().contains("not callable"));
    assert_eq!(flux, vec![1.0]);
}

#[test]
fn test_raising_function_is_a_call_failure() {
    let (_dir, bridge) = stub_bridge(
        "stub_raises",
        r#"
def model(engs, params, flux):
    flux[0] = -1.0
    raise ValueError("Invalid params")
"#,
    );

    let mut flux = vec![8.0, 9.0];
    let err = bridge.invoke(&[1.0, 2.0, 3.0], &[1.0], &mut flux).unwrap_err();

    assert_eq!(err.kind(), FailureKind::CallFailure);
    assert!(err.to_string().contains("ValueError"));
    assert!(err.to_string().contains("Invalid params"));
    assert_eq!(flux, vec![8.0, 9.0]);
}

#[test]
fn test_short_result_is_a_conversion_failure() {
    let (_dir, bridge) = stub_bridge(
        "stub_short",
        r#"
def model(engs, params, flux):
    return [1.0]
"#,
    );

    let mut flux = vec![8.0, 9.0, 10.0];
    let err = bridge
        .invoke(&[1.0, 2.0, 3.0, 4.0], &[1.0], &mut flux)
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::ConversionFailure);
    assert_eq!(flux, vec![8.0, 9.0, 10.0]);
}

#[test]
fn test_non_numeric_result_is_a_conversion_failure() {
    let (_dir, bridge) = stub_bridge(
        "stub_non_numeric",
        r#"
def model(engs, params, flux):
    return [1.0, "two"]
"#,
    );

    let mut flux = vec![0.0, 0.0];
    let err = bridge.invoke(&[1.0, 2.0, 3.0], &[1.0], &mut flux).unwrap_err();

    assert_eq!(err.kind(), FailureKind::ConversionFailure);
    assert_eq!(flux, vec![0.0, 0.0]);
}

#[test]
fn test_missing_module_makes_bridge_non_functional() {
    let dir = tempfile::tempdir().unwrap();
    let config = stub_config(&dir, "stub_does_not_exist", "model");

    let err = Bridge::try_new(config.clone()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::ModuleLoadFailure);

    let bridge = Bridge::new(config);
    assert!(!bridge.is_loaded());

    let mut flux = vec![4.0];
    let err = bridge.invoke(&[1.0, 2.0], &[1.0], &mut flux).unwrap_err();
    assert!(matches!(err, BridgeError::ModuleNotLoaded));
    assert_eq!(flux, vec![4.0]);
}

#[test]
fn test_module_raising_on_import() {
    let module = "stub_import_error";
    let dir = write_module(module, "import definitely_not_installed_xyz\n");

    let err = Bridge::try_new(stub_config(&dir, module, "model")).unwrap_err();

    assert_eq!(err.kind(), FailureKind::ModuleLoadFailure);
    assert!(err.to_string().contains("ModuleNotFoundError"));
}

// ============================================================================
// Repeatability and Configuration
// ============================================================================

#[test]
fn test_repeated_invocation_is_deterministic() {
    let (_dir, bridge) = stub_bridge(
        "stub_deterministic",
        r#"
def model(engs, params, flux):
    return [params[0] * (hi - lo) for lo, hi in zip(engs, engs[1:])]
"#,
    );

    let energies = [0.5, 0.75, 1.25, 2.0];
    let params = [3.0];

    let mut first = vec![0.0; 3];
    let mut second = vec![0.0; 3];
    bridge.invoke(&energies, &params, &mut first).unwrap();
    bridge.invoke(&energies, &params, &mut second).unwrap();

    assert_bits_eq(&first, &second);
    assert_bits_eq(&first, &[0.75, 1.5, 2.25]);
}

/// Model that replaces its own `sys.modules` entry with a module whose
/// `model` returns 2.0, after returning 1.0 itself.
const SELF_REPLACING_MODEL: &str = r#"
import sys
import types

def model(engs, params, flux):
    replacement = types.ModuleType(__name__)
    exec("def model(engs, params, flux):\n    return [2.0] * len(flux)\n", replacement.__dict__)
    sys.modules[__name__] = replacement
    return [1.0] * len(flux)
"#;

fn caching_bridge(module: &str, cache_module: bool) -> (TempDir, Bridge) {
    let dir = write_module(module, SELF_REPLACING_MODEL);
    let config = BridgeConfig::builder()
        .script_dir(dir.path())
        .module_name(module)
        .function_name("model")
        .support_modules(Vec::<String>::new())
        .cache_module(cache_module)
        .build()
        .unwrap();
    let bridge = Bridge::try_new(config).unwrap();
    (dir, bridge)
}

#[test]
fn test_cached_module_ignores_sys_modules_replacement() {
    let (_dir, bridge) = caching_bridge("stub_cached_module", true);

    let mut flux = vec![0.0; 2];
    bridge.invoke(&[1.0, 2.0, 3.0], &[1.0], &mut flux).unwrap();
    assert_eq!(flux, vec![1.0, 1.0]);
    bridge.invoke(&[1.0, 2.0, 3.0], &[1.0], &mut flux).unwrap();
    assert_eq!(flux, vec![1.0, 1.0]);
}

#[test]
fn test_uncached_module_is_resolved_each_call() {
    let (_dir, bridge) = caching_bridge("stub_uncached_module", false);

    let mut flux = vec![0.0; 2];
    bridge.invoke(&[1.0, 2.0, 3.0], &[1.0], &mut flux).unwrap();
    assert_eq!(flux, vec![1.0, 1.0]);
    bridge.invoke(&[1.0, 2.0, 3.0], &[1.0], &mut flux).unwrap();
    assert_eq!(flux, vec![2.0, 2.0]);
}

#[test]
fn test_support_modules_are_bound_in_main() {
    let module = "stub_support";
    let dir = write_module(
        module,
        r#"
import __main__

def model(engs, params, flux):
    return [1.0 if hasattr(__main__, "json") else 0.0] * len(flux)
"#,
    );
    let config = BridgeConfig::builder()
        .script_dir(dir.path())
        .module_name(module)
        .function_name("model")
        .support_modules(["json.decoder", "definitely_not_installed_xyz"])
        .build()
        .unwrap();

    // A failed support import is logged, not fatal.
    let bridge = Bridge::try_new(config).unwrap();

    let mut flux = vec![0.0];
    bridge.invoke(&[1.0, 2.0], &[1.0], &mut flux).unwrap();
    assert_eq!(flux, vec![1.0]);
}

// ============================================================================
// Bundled Script
// ============================================================================

#[test]
#[ignore = "Requires pyatomdb, numpy and scipy in the embedded interpreter"]
fn test_bundled_pyapec_script() {
    let config = BridgeConfig::default();
    let bridge = Bridge::try_new(config).expect("bundled script should import");

    let energies: Vec<f64> = (0..=100).map(|i| 0.5 + 0.05 * f64::from(i)).collect();
    // kT, abundance, redshift, norm
    let params = [1.0, 1.0, 0.0, 1.0];
    let mut flux = Vec::new();
    let mut flux_err = Vec::new();

    evaluate(&bridge, &energies, &params, &mut flux, &mut flux_err).unwrap();

    assert_eq!(flux.len(), 100);
    assert!(flux.iter().all(|f| f.is_finite() && *f >= 0.0));
    assert!(flux.iter().any(|f| *f > 0.0));
}
