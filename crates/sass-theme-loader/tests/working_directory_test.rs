//! Import resolution must not depend on the process working directory.
//!
//! Kept in its own test binary since it changes the working directory.

use sass_theme_loader::{
    ImporterOption, LoaderContext, LoaderInput, LoaderOptions, LoaderServices, ResolveOptions,
    theme_sass_loader,
};

#[test]
fn test_sibling_wins_over_working_directory() {
    let cwd = tempfile::tempdir().unwrap();
    std::fs::write(cwd.path().join("colors.scss"), "$c: red;\n").unwrap();

    let project = tempfile::tempdir().unwrap();
    let theme = project.path().join("vars.scss");
    std::fs::write(&theme, "$primary-color: #1890ff;\n").unwrap();
    std::fs::write(project.path().join("colors.scss"), "$c: blue;\n").unwrap();
    let resource = project.path().join("app.scss");

    std::env::set_current_dir(cwd.path()).unwrap();

    let options = LoaderOptions {
        scss_theme_path: Some(theme),
        importer: ImporterOption::None,
        ..Default::default()
    };
    let (mut context, completion) = LoaderContext::new(&resource, options, ResolveOptions::default());
    pollster::block_on(theme_sass_loader(
        &mut context,
        LoaderInput::new("@import \"colors\";\n.a { color: $c; }\n"),
        &LoaderServices::default(),
    ));

    let css = pollster::block_on(completion.wait()).unwrap().css;
    assert!(css.contains("color: blue"), "{css}");
}
