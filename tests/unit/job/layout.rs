use super::*;

#[test]
fn paths_share_the_job_name() {
    let layout = ScratchLayout::in_dir("/scratch");
    assert_eq!(layout.source_path(), Path::new("/scratch/job.tex"));
    assert_eq!(layout.artifact_path(), Path::new("/scratch/job.pdf"));
    assert_eq!(layout.output_dir(), Path::new("/scratch"));
}

#[test]
fn empty_extension_means_bare_name() {
    let layout = ScratchLayout {
        source_ext: String::new(),
        ..ScratchLayout::in_dir("/s")
    };
    assert_eq!(layout.source_path(), Path::new("/s/job"));
    assert!(layout.validate().is_ok());
}

#[test]
fn names_must_stay_inside_dir() {
    for bad in ["a/b", "a\\b", ".."] {
        let layout = ScratchLayout {
            job_name: bad.to_string(),
            ..ScratchLayout::default()
        };
        assert!(layout.validate().is_err(), "{bad}");
    }

    let layout = ScratchLayout {
        dir: PathBuf::new(),
        ..ScratchLayout::default()
    };
    assert!(layout.validate().is_err());
}
