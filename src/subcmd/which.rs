use std::io::{self, Write};

use eyre::Result;

use crate::{args::Which, detect::PackageManager, fl};

pub fn execute(args: Which, pm: &PackageManager) -> Result<()> {
    write_which(&args, pm, &mut io::stdout().lock())
}

/// Scripts parse this output, so nothing but the descriptor goes here.
fn write_which(args: &Which, pm: &PackageManager, out: &mut impl Write) -> Result<()> {
    if args.json {
        serde_json::to_writer_pretty(&mut *out, pm)?;
        writeln!(out)?;
    } else if args.simple {
        writeln!(out, "{}", pm.name)?;
    } else {
        writeln!(
            out,
            "{}",
            fl!(
                "which-detected",
                name = pm.name,
                family = pm.family.to_string()
            )
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(simple: bool, json: bool) -> String {
        let pm = PackageManager::by_name("apk").unwrap();
        let mut out = vec![];
        write_which(&Which { simple, json }, &pm, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_simple_prints_only_the_name() {
        assert_eq!(render(true, false), "apk\n");
    }

    #[test]
    fn test_json_is_the_whole_output() {
        let out = render(false, true);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["name"], "apk");
        assert_eq!(value["family"], "alpine");
        assert!(out.starts_with('{'));
    }

    #[test]
    fn test_default_names_the_family() {
        let out = render(false, false);
        assert!(out.contains("apk"));
        assert!(out.contains("alpine"));
    }
}
