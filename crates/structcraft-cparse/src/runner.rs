//! Invocation of the castxml executable.

use std::{
    io::ErrorKind,
    path::Path,
    process::{Command, Output},
};

use crate::errors::ExternalToolError;

/// Runs `cmd <extra_args> <inputs> --castxml-output=1 -o <xml_path>` and checks that the XML
/// was written.
pub fn run_castxml<P: AsRef<Path>>(
    cmd: &str,
    extra_args: &[String],
    inputs: &[P],
    xml_path: &Path,
) -> Result<(), ExternalToolError> {
    let mut command = Command::new(cmd);
    command
        .args(extra_args)
        .args(inputs.iter().map(|input| input.as_ref()))
        .arg("--castxml-output=1")
        .arg("-o")
        .arg(xml_path);

    let command_line = format!("{command:?}");
    tracing::debug!(command = %command_line, "running castxml");

    let output = command.output().map_err(|source| match source.kind() {
        ErrorKind::NotFound => ExternalToolError::NotFound {
            command: cmd.to_string(),
        },
        _ => ExternalToolError::Spawn {
            command: cmd.to_string(),
            source,
        },
    })?;

    if !output.status.success() {
        return Err(ExternalToolError::Failed {
            command_line,
            status: output.status.to_string(),
            output: combined(&output),
        });
    }
    if !xml_path.is_file() {
        return Err(ExternalToolError::NoOutput {
            path: xml_path.to_path_buf(),
            output: combined(&output),
        });
    }
    Ok(())
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable() {
        let err = run_castxml(
            "structcraft-no-such-castxml",
            &[],
            &["x.h"],
            Path::new("out.xml"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExternalToolError::NotFound { command } if command == "structcraft-no-such-castxml"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_status() {
        // `false` ignores its arguments and exits with 1
        let err = run_castxml("false", &[], &["x.h"], Path::new("out.xml")).unwrap_err();
        assert!(matches!(err, ExternalToolError::Failed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_success_without_output() {
        let dir = std::env::temp_dir().join("structcraft-cparse-runner-no-output.xml");
        let err = run_castxml("true", &[], &["x.h"], &dir).unwrap_err();
        assert!(matches!(err, ExternalToolError::NoOutput { path, .. } if path == dir));
    }
}
