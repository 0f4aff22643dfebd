use crate::cli::{print_views, Cli, Commands};
use crate::view::ViewFolderParser;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_serve_command_parses() {
    let cli = Cli::try_parse_from(["brrtmvc", "serve", "--config", "brrtmvc.yaml", "--addr", "127.0.0.1:9000"])
        .unwrap();
    match cli.command {
        Commands::Serve { config, addr } => {
            assert_eq!(config, Some(PathBuf::from("brrtmvc.yaml")));
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_views_command_defaults_suffix() {
    let cli = Cli::try_parse_from(["brrtmvc", "views", "tests/views"]).unwrap();
    match cli.command {
        Commands::Views { dir, suffix } => {
            assert_eq!(dir, PathBuf::from("tests/views"));
            assert_eq!(suffix, ".ghtml");
        }
        _ => panic!("Expected Views command"),
    }
}

#[test]
fn test_views_requires_dir() {
    assert!(Cli::try_parse_from(["brrtmvc", "views"]).is_err());
}

#[test]
fn test_print_views_lists_sorted_entries() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Home")).unwrap();
    std::fs::write(dir.path().join("layout.ghtml"), "{% include \"content\" %}").unwrap();
    std::fs::write(
        dir.path().join("Home/Index.ghtml"),
        "{% macro ViewOptions() %}\nMasterPage=layout.ghtml\n{% endmacro %}hi",
    )
    .unwrap();
    std::fs::write(dir.path().join("Home/About.ghtml"), "about").unwrap();

    let views = ViewFolderParser::new(dir.path()).parse().unwrap();
    let mut out = Vec::new();
    print_views(&views, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Home/About\t"));
    assert!(lines[1].starts_with("Home/Index\t"));
    assert!(lines[1].contains("master="));
}
