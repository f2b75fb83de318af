//! Parse and validate the generated WGSL with naga, and check that the
//! uniform structs line up with their Rust counterparts.

use murmuration::shader;
use murmuration::uniforms::{SimUniforms, ViewUniforms};

fn validate(source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

fn struct_size(module: &naga::Module, name: &str) -> Option<u32> {
    module.types.iter().find_map(|(_, ty)| match (&ty.name, &ty.inner) {
        (Some(n), naga::TypeInner::Struct { span, .. }) if n == name => Some(*span),
        _ => None,
    })
}

fn has_entry_point(module: &naga::Module, name: &str, stage: naga::ShaderStage) -> bool {
    module
        .entry_points
        .iter()
        .any(|ep| ep.name == name && ep.stage == stage)
}

#[test]
fn test_velocity_shader_validates() {
    let module = validate(&shader::velocity_shader()).unwrap_or_else(|e| panic!("{}", e));
    assert!(has_entry_point(&module, "main", naga::ShaderStage::Compute));
    assert_eq!(
        struct_size(&module, "SimUniforms"),
        Some(std::mem::size_of::<SimUniforms>() as u32)
    );
}

#[test]
fn test_position_shader_validates() {
    let module = validate(&shader::position_shader()).unwrap_or_else(|e| panic!("{}", e));
    assert!(has_entry_point(&module, "main", naga::ShaderStage::Compute));
    assert_eq!(
        struct_size(&module, "SimUniforms"),
        Some(std::mem::size_of::<SimUniforms>() as u32)
    );
}

#[test]
fn test_render_shader_validates() {
    let module = validate(&shader::render_shader()).unwrap_or_else(|e| panic!("{}", e));
    assert!(has_entry_point(&module, "vs_main", naga::ShaderStage::Vertex));
    assert!(has_entry_point(&module, "fs_main", naga::ShaderStage::Fragment));
    assert_eq!(
        struct_size(&module, "ViewUniforms"),
        Some(std::mem::size_of::<ViewUniforms>() as u32)
    );
}

#[test]
fn test_compute_workgroup_size() {
    for source in [shader::velocity_shader(), shader::position_shader()] {
        let module = validate(&source).unwrap_or_else(|e| panic!("{}", e));
        let main = module
            .entry_points
            .iter()
            .find(|ep| ep.name == "main")
            .unwrap();
        assert_eq!(main.workgroup_size, [shader::WORKGROUP_SIZE, 1, 1]);
    }
}
