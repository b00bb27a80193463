use anyhow::Result;
use fixwatch::config::{Config, FileSystemConfig};
use fixwatch::config::validator::ConfigValidator;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn test_malformed_toml_configs() -> Result<()> {
    let dir = tempdir()?;

    let malformed_configs = vec![
        // Invalid TOML syntax
        ("invalid_syntax.toml", "invalid toml content {{ broken"),
        ("unclosed_brackets.toml", "[storage\ncompression_level = 3"),
        (
            "invalid_quotes.toml",
            "[reports]\nindex_path = \"unclosed string",
        ),
        // Valid TOML but invalid values
        ("zero_compression.toml", "[storage]\ncompression_level = 0"),
        ("huge_compression.toml", "[storage]\ncompression_level = 999"),
        ("zero_threads.toml", "[performance]\nparallel_threads = 0"),
        (
            "negative_threads.toml",
            "[performance]\nparallel_threads = -5",
        ),
        ("tiny_buffer.toml", "[performance]\nhash_buffer_size = 16"),
        ("bad_glob.toml", "[scanning]\nignore_patterns = [\"[unclosed\"]"),
        // Type mismatches
        (
            "string_compression.toml",
            "[storage]\ncompression_level = \"high\"",
        ),
        ("bool_threads.toml", "[performance]\nparallel_threads = true"),
        (
            "array_base_path.toml",
            concat!(
                "[[file_systems]]\nbase_path = [\"a\", \"b\"]\n",
                "inventory_path = \"/inv\"\nreport_path = \"/rep\"",
            ),
        ),
        // Incomplete or relative file systems
        (
            "missing_report_path.toml",
            "[[file_systems]]\nbase_path = \"/data\"\ninventory_path = \"/inv\"",
        ),
        (
            "relative_base.toml",
            concat!(
                "[[file_systems]]\nbase_path = \"data\"\n",
                "inventory_path = \"/inv\"\nreport_path = \"/rep\"",
            ),
        ),
    ];

    for (filename, content) in malformed_configs {
        let config_path = dir.path().join(filename);
        fs::write(&config_path, content)?;
        assert!(
            Config::load(&config_path).is_err(),
            "{filename} should be rejected"
        );
    }

    Ok(())
}

#[test]
fn test_duplicate_base_paths_are_rejected() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("dup.toml");
    fs::write(
        &config_path,
        r#"
[[file_systems]]
base_path = "/data"
inventory_path = "/inv/a"
report_path = "/rep/a"

[[file_systems]]
base_path = "/data"
inventory_path = "/inv/b"
report_path = "/rep/b"
"#,
    )?;

    let err = Config::load(&config_path).unwrap_err();
    assert!(format!("{err:#}").contains("more than once"));
    Ok(())
}

#[test]
fn test_saved_config_loads_back() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("nested/dir/config.toml");

    let mut config = Config::default();
    config.file_systems.push(FileSystemConfig {
        base_path: PathBuf::from("/archive"),
        inventory_path: PathBuf::from("/var/lib/fixwatch"),
        report_path: PathBuf::from("/var/lib/fixwatch/reports"),
    });
    config.storage.compression_level = 19;
    config.save(&config_path)?;

    let loaded = Config::load(&config_path)?;
    assert_eq!(loaded.file_systems, config.file_systems);
    assert_eq!(loaded.storage.compression_level, 19);
    assert_eq!(loaded.scanning.ignore_patterns, config.scanning.ignore_patterns);
    Ok(())
}

#[test]
fn test_nested_base_paths_resolve_innermost() -> Result<()> {
    let fs_config = |base: &str| FileSystemConfig {
        base_path: PathBuf::from(base),
        inventory_path: PathBuf::from("/inv"),
        report_path: PathBuf::from("/rep"),
    };
    let mut config = Config::default();
    config.file_systems = vec![fs_config("/archive"), fs_config("/archive/photos")];

    let find = |path: &str| {
        config
            .find_file_system(Path::new(path))
            .map(|fs| fs.base_path.clone())
    };
    assert_eq!(find("/archive/photos/2024"), Some(PathBuf::from("/archive/photos")));
    assert_eq!(find("/archive/docs"), Some(PathBuf::from("/archive")));
    assert_eq!(find("/archive-old"), None);
    assert_eq!(find("/elsewhere"), None);
    Ok(())
}

#[test]
fn test_unknown_keys_warn_without_failing() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("extra.toml");
    let content = r#"
[scanning]
follow_symlinks = false
folow_symlinks = true

[[file_systems]]
base_path = "/data"
inventory_path = "/inv"
report_path = "/rep"
mount_options = "ro"
"#;
    fs::write(&config_path, content)?;

    assert!(Config::load(&config_path).is_ok());
    let warnings = ConfigValidator::new().collect_warnings(content)?;
    assert_eq!(warnings.len(), 2, "{warnings:?}");
    assert!(warnings.iter().any(|w| w.contains("folow_symlinks")));
    assert!(warnings.iter().any(|w| w.contains("mount_options")));
    Ok(())
}
