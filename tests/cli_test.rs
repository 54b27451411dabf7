use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::Path;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn sample_text() -> Vec<u8> {
    let verse = "To be, or not to be, that is the question:\n\
        Whether 'tis nobler in the mind to suffer\n\
        The slings and arrows of outrageous fortune,\n\
        Or to take arms against a sea of troubles\n";
    verse.repeat(500).into_bytes()
}

fn compress_file(in_path: &Path,out_path: Option<&Path>) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("lzwhuff").expect("binary not found");
    cmd.arg("compress").arg("-i").arg(in_path);
    if let Some(p) = out_path {
        cmd.arg("-o").arg(p);
    }
    cmd.assert()
}

fn expand_file(in_path: &Path,out_path: Option<&Path>) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("lzwhuff").expect("binary not found");
    cmd.arg("expand").arg("-i").arg(in_path);
    if let Some(p) = out_path {
        cmd.arg("-o").arg(p);
    }
    cmd.assert()
}

#[test]
fn compress_and_expand() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let txt = sample_text();
    let in_path = temp_dir.path().join("hamlet.txt");
    let cmp_path = temp_dir.path().join("hamlet.compr");
    let out_path = temp_dir.path().join("hamlet.out");
    std::fs::write(&in_path,&txt)?;
    compress_file(&in_path,Some(&cmp_path))
        .success()
        .stderr(predicate::str::contains(format!("compressed {} into",txt.len())));
    let compressed = std::fs::read(&cmp_path)?;
    assert_eq!(compressed,lzwhuff::compress_slice(&txt,&lzwhuff::STD_OPTIONS,None)?);
    assert!(compressed.len() < txt.len() / 2);
    expand_file(&cmp_path,Some(&out_path))
        .success()
        .stderr(predicate::str::contains(format!("expanded {} into {}",compressed.len(),txt.len())));
    assert_eq!(std::fs::read(&out_path)?,txt);
    Ok(())
}

#[test]
fn default_output_names() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let txt = sample_text();
    let in_path = temp_dir.path().join("tempest.txt");
    std::fs::write(&in_path,&txt)?;
    compress_file(&in_path,None).success();
    let cmp_path = temp_dir.path().join("tempest.txt.compr");
    assert!(cmp_path.exists());
    expand_file(&cmp_path,None).success();
    let out_path = temp_dir.path().join("tempest.txt.decompr");
    assert_eq!(std::fs::read(&out_path)?,txt);
    Ok(())
}

#[test]
fn inspect_artifact() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("tobe.txt");
    let cmp_path = temp_dir.path().join("tobe.compr");
    std::fs::write(&in_path,"TOBEORNOTTOBEORTOBEORNOT")?;
    compress_file(&in_path,Some(&cmp_path)).success();
    Command::cargo_bin("lzwhuff")?
        .arg("inspect")
        .arg("-i").arg(&cmp_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("tree leaves:   13"))
        .stdout(predicate::str::contains("tree nodes:    25"));
    Ok(())
}

#[test]
fn empty_file_is_refused() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("empty.txt");
    let cmp_path = temp_dir.path().join("empty.compr");
    std::fs::write(&in_path,b"")?;
    compress_file(&in_path,Some(&cmp_path))
        .failure()
        .stderr(predicate::str::contains("EmptyInput"));
    assert!(!cmp_path.exists());
    Ok(())
}

#[test]
fn garbage_is_refused() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("garbage.compr");
    let out_path = temp_dir.path().join("garbage.out");
    std::fs::write(&in_path,"this was never compressed")?;
    expand_file(&in_path,Some(&out_path))
        .failure()
        .stderr(predicate::str::contains("CorruptStream"));
    assert!(!out_path.exists());
    Ok(())
}
