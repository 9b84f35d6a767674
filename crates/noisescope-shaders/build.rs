//! Compiles the GLSL sources in `shaders/` to SPIR-V when the `compile`
//! feature is enabled.

fn main() {
    println!("cargo:rerun-if-changed=shaders/");

    #[cfg(feature = "compile")]
    compile::all();
}

#[cfg(feature = "compile")]
mod compile {
    use shaderc::{Compiler, ShaderKind};
    use std::env;
    use std::fs;
    use std::path::{Path, PathBuf};

    const SOURCES: [(&str, ShaderKind); 4] = [
        ("test.vert", ShaderKind::Vertex),
        ("test.frag", ShaderKind::Fragment),
        ("texture.vert", ShaderKind::Vertex),
        ("texture.frag", ShaderKind::Fragment),
    ];

    pub fn all() {
        let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"))
            .join("spirv");
        fs::create_dir_all(&out_dir).expect("Failed to create SPIR-V output directory");

        let compiler = Compiler::new().expect("Failed to create shader compiler");
        let shader_dir = Path::new("shaders");

        for (name, kind) in SOURCES {
            compile_shader(
                &compiler,
                &shader_dir.join(name),
                &out_dir.join(format!("{name}.spv")),
                kind,
            );
        }

        println!(
            "cargo:rustc-env=NOISESCOPE_COMPILED_SHADER_DIR={}",
            out_dir.display()
        );
    }

    fn compile_shader(compiler: &Compiler, input: &Path, output: &Path, kind: ShaderKind) {
        let source = fs::read_to_string(input)
            .unwrap_or_else(|e| panic!("Failed to read shader {}: {e}", input.display()));

        let file_name = input
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("shader");

        let mut options =
            shaderc::CompileOptions::new().expect("Failed to create compile options");
        options.set_target_env(
            shaderc::TargetEnv::Vulkan,
            shaderc::EnvVersion::Vulkan1_2 as u32,
        );
        options.set_optimization_level(shaderc::OptimizationLevel::Performance);

        let artifact = compiler
            .compile_into_spirv(&source, kind, file_name, "main", Some(&options))
            .unwrap_or_else(|e| panic!("Failed to compile shader {}: {e}", input.display()));

        if artifact.get_num_warnings() > 0 {
            println!(
                "cargo:warning={}: {}",
                input.display(),
                artifact.get_warning_messages()
            );
        }

        fs::write(output, artifact.as_binary_u8())
            .unwrap_or_else(|e| panic!("Failed to write shader {}: {e}", output.display()));
    }
}
