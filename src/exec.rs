use std::fmt;

use eyre::{bail, Result};
use tracing::info;

use crate::{
    detect::{Native, PackageManager, Verb},
    fl,
    repo::Runner,
};

/// One child process to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }

        Ok(())
    }
}

/// Translates a unified verb into the native command lines, in execution order.
pub fn plan(
    pm: &PackageManager,
    verb: Verb,
    assume_yes: bool,
    extra: &[String],
) -> Result<Vec<Invocation>> {
    let yes_flag = pm.yes_flag.filter(|_| assume_yes);

    let with_bin = |native: &[&str], extra: &[String]| {
        let args = yes_flag
            .into_iter()
            .map(String::from)
            .chain(native.iter().map(|arg| arg.to_string()))
            .chain(extra.iter().cloned())
            .collect();

        Invocation {
            program: pm.bin.to_string(),
            args,
        }
    };

    let invocations = match pm.command(verb) {
        Native::Args(native) => vec![with_bin(*native, extra)],
        Native::Sequence(steps) => steps.iter().map(|step| with_bin(*step, &[])).collect(),
        Native::Shell(script) => {
            let yes = yes_flag.map(|f| format!(" {f}")).unwrap_or_default();
            vec![Invocation {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.replace("{yes}", &yes)],
            }]
        }
        Native::Unsupported => {
            bail!(fl!("verb-unsupported", verb = verb.to_string(), pm = pm.name))
        }
    };

    Ok(invocations)
}

pub fn run(
    pm: &PackageManager,
    verb: Verb,
    assume_yes: bool,
    extra: &[String],
    runner: &dyn Runner,
) -> Result<()> {
    for invocation in plan(pm, verb, assume_yes, extra)? {
        info!("{}", fl!("executing", cmd = invocation.to_string()));
        let args = invocation.args.iter().map(String::as_str).collect::<Vec<_>>();
        runner.run(&invocation.program, &args)?;
    }

    Ok(())
}
