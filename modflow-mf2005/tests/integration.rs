use approx::assert_abs_diff_eq;
use modflow_core::{CellIndex, NameFile};
use modflow_mf2005::{
    Damping, Dis, Error, FlowCell, FlowGroup, FlowKind, FlowTime, Flwob, Gmg, HeadObservation, Hob, LoadOptions,
    Model, Package, RawPackage, StressPeriod, Swt, SwtOutputControl,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn dis() -> Dis {
    Dis::new(1, 11, 11, 2).with_periods(vec![
        StressPeriod::new(1.0, 1, 1.0, true),
        StressPeriod::new(1.0, 1, 1.0, false),
    ])
}

fn hob() -> Hob {
    let single = HeadObservation::new("hob1", CellIndex::new(0, 5, 5), &[(1.0, 54.4)]);
    let series = HeadObservation::new("hob2", CellIndex::new(0, 2, 7), &[(1.0, 50.1), (2.0, 50.9)]);
    Hob::new(51, -9999.0, vec![single, series])
}

fn drob() -> Flwob {
    let group = FlowGroup::new(
        vec![FlowTime {
            obsnam: "drob_1".to_string(),
            irefsp: 1,
            toffset: 0.5,
            flwobs: -5.678,
        }],
        vec![
            FlowCell {
                cell: CellIndex::new(0, 4, 4),
                factor: 0.25,
            },
            FlowCell {
                cell: CellIndex::new(0, 4, 5),
                factor: 0.75,
            },
        ],
    );
    Flwob::new(FlowKind::Drn, 45, vec![group])
}

fn hob_simple(dir: &Path) -> Model {
    let mut model = Model::new("hob_simple", dir);
    model.add_package(dis()).unwrap();
    model
        .add_package(RawPackage::new("BAS6", 13, "# basic\nFREE\nCONSTANT 1\nHNOFLO\nCONSTANT 0.0\n"))
        .unwrap();
    model.add_package(hob()).unwrap();
    model
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

// --- Creating and writing ---

#[test]
fn hob_simple_writes_name_file_and_packages() {
    let dir = TempDir::new().unwrap();
    let model = hob_simple(dir.path());
    model.write_input().unwrap();

    assert!(dir.path().join("hob_simple.dis").exists());
    assert!(dir.path().join("hob_simple.bas6").exists());
    assert!(dir.path().join("hob_simple.hob").exists());

    let namefile = NameFile::read(dir.path().join("hob_simple.nam")).unwrap();
    let ftypes: Vec<&str> = namefile.entries().iter().map(|e| e.ftype.as_str()).collect();
    assert_eq!(ftypes, ["LIST", "DIS", "BAS6", "HOB", "DATA"]);
    let data = namefile.by_ftype("DATA").unwrap();
    assert_eq!((data.unit, data.fname.as_str()), (51, "hob_simple.hob.out"));
}

#[test]
fn custom_file_names() {
    let dir = TempDir::new().unwrap();
    let mut model = Model::new("hob_simple", dir.path());
    model.add_package(dis()).unwrap();
    model
        .add_package_with_filenames(
            hob(),
            &["hob_simple_custom_fname.hob", "hob_simple_custom_fname.hob.out"],
        )
        .unwrap();
    assert_eq!(model.get_output(51), Some("hob_simple_custom_fname.hob.out"));

    model.write_input().unwrap();
    assert!(dir.path().join("hob_simple_custom_fname.hob").exists());
    assert!(read(dir.path().join("hob_simple.nam")).contains("hob_simple_custom_fname.hob.out"));
}

#[test]
fn renamed_model_writes_under_new_name() {
    let dir = TempDir::new().unwrap();
    let mut model = hob_simple(dir.path());
    model.set_name("renamed");
    model.write_input().unwrap();
    assert!(dir.path().join("renamed.nam").exists());
    assert!(dir.path().join("renamed.hob").exists());
    assert_eq!(model.get_output(51), Some("renamed.hob.out"));
}

// --- Loading ---

#[test]
fn load_and_rewrite() {
    let dir = TempDir::new().unwrap();
    hob_simple(dir.path()).write_input().unwrap();

    let mut model = Model::load(dir.path().join("hob_simple.nam"), &LoadOptions::default()).unwrap();
    assert_eq!(model.dimensions().unwrap(), (11, 11, 1, 2));
    assert_eq!(model.dis(), Some(&dis()));
    assert!(model.package("BAS6").unwrap().is_raw());

    let loaded = model.hob().unwrap();
    assert_eq!(loaded.nh(), 3);
    let series = loaded.observation("hob2").unwrap();
    let times: Vec<f64> = series.time_series.iter().map(|t| t.totim).collect();
    assert_eq!(times, vec![1.0, 2.0]);
    assert_abs_diff_eq!(loaded.observation("hob1").unwrap().time_series[0].hobs, 54.4);

    let out = TempDir::new().unwrap();
    model.change_workspace(out.path());
    model.write_input().unwrap();
    assert_eq!(
        read(out.path().join("hob_simple.bas6")),
        read(dir.path().join("hob_simple.bas6"))
    );
    let again = Model::load(out.path().join("hob_simple.nam"), &LoadOptions::default()).unwrap();
    assert_eq!(again.hob(), model.hob());
}

#[test]
fn external_array_files_follow_workspace() {
    let dir = TempDir::new().unwrap();
    let mut model = Model::new("hob_simple", dir.path());
    model.add_package(dis()).unwrap();
    let bas = "# basic\nFREE\nOPEN/CLOSE arrays/ibound.ref 1 (FREE) -1\nHNOFLO\nEXTERNAL 31 1.0 (FREE) -1\n";
    model.add_package(RawPackage::new("BAS6", 13, bas)).unwrap();
    model.add_output_file(31, Some("strt.dat"), "", false).unwrap();
    model.write_input().unwrap();
    fs::create_dir(dir.path().join("arrays")).unwrap();
    fs::write(dir.path().join("arrays/ibound.ref"), "1 1 1\n").unwrap();
    fs::write(dir.path().join("strt.dat"), "10.0\n").unwrap();

    let mut model = Model::load(dir.path().join("hob_simple.nam"), &LoadOptions::default()).unwrap();
    let out = TempDir::new().unwrap();
    model.change_workspace(out.path());
    model.write_input().unwrap();
    assert_eq!(read(out.path().join("arrays/ibound.ref")), "1 1 1\n");
    assert_eq!(read(out.path().join("strt.dat")), "10.0\n");
    assert!(Model::load(out.path().join("hob_simple.nam"), &LoadOptions::default()).is_ok());
}

#[test]
fn missing_dis_is_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("m.nam"), "LIST 2 m.list\nBAS6 13 m.bas\n").unwrap();
    let err = Model::load(dir.path().join("m.nam"), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MissingDis));
}

#[test]
fn reads_hob_output_table() {
    let dir = TempDir::new().unwrap();
    let model = hob_simple(dir.path());
    fs::write(
        dir.path().join("hob_simple.hob.out"),
        " \"SIMULATED EQUIVALENT\"   \"OBSERVED VALUE\"    \"OBSERVATION NAME\"\n\
         54.0  54.4  hob1\n\
         50.0  50.1  hob2.1\n\
         51.0  50.9  hob2.2\n",
    )
    .unwrap();
    let output = model.read_hob_output().unwrap();
    assert_eq!(output.rows.len(), 3);
    assert_abs_diff_eq!(output.get("hob2.2").unwrap().residual(), -0.1, epsilon = 1e-12);
}

// --- Removing and replacing ---

#[test]
fn removed_hob_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let mut model = hob_simple(dir.path());
    model.remove_package("HOB").unwrap();
    model.write_input().unwrap();

    let text = read(dir.path().join("hob_simple.nam"));
    assert!(!text.contains("HOB"));
    assert!(!text.contains("hob.out"));
    assert!(model.get_output(51).is_none());
}

#[test]
fn replaced_hob_registers_new_output() {
    let dir = TempDir::new().unwrap();
    let mut model = hob_simple(dir.path());
    let obs = HeadObservation::new("hob9", CellIndex::new(0, 1, 1), &[(2.0, 1.0)]);
    model.add_package(Hob::new(52, -9999.0, vec![obs])).unwrap();

    assert_eq!(model.packages().len(), 3);
    assert!(model.get_output(51).is_none());
    assert_eq!(model.get_output(52), Some("hob_simple.hob.out"));
    assert!(model.hob().unwrap().observation("hob9").is_some());
}

#[test]
fn failed_replacement_keeps_old_package() {
    let dir = TempDir::new().unwrap();
    let mut model = hob_simple(dir.path());
    let before: Vec<String> = model.packages().iter().map(|p| p.ftype().to_string()).collect();

    let mut clash = Hob::new(52, -9999.0, Vec::new());
    clash.unit = 13;
    assert!(model.add_package(clash).is_err());
    let bad_output = Hob::new(13, -9999.0, Vec::new());
    assert!(model.add_package(bad_output).is_err());

    let after: Vec<String> = model.packages().iter().map(|p| p.ftype().to_string()).collect();
    assert_eq!(after, before);
    assert_eq!(model.get_output(51), Some("hob_simple.hob.out"));
    assert!(model.get_output(52).is_none());
    assert_eq!(model.hob().unwrap().nh(), 3);
    model.write_input().unwrap();
    assert!(read(dir.path().join("hob_simple.nam")).contains("hob_simple.hob.out"));
}

// --- Flow observations ---

#[test]
fn drain_observations_round_trip_with_load_only() {
    let dir = TempDir::new().unwrap();
    let mut model = hob_simple(dir.path());
    model.add_package(drob()).unwrap();
    model.write_input().unwrap();
    assert_eq!(model.get_output(45), Some("hob_simple.drob.out"));

    let options = LoadOptions::default().with_load_only(["DROB"]);
    let loaded = Model::load(dir.path().join("hob_simple.nam"), &options).unwrap();
    assert!(loaded.hob().is_none());
    assert!(loaded.package("BAS6").is_none());
    assert_eq!(loaded.flwob(FlowKind::Drn), Some(&drob()));
    assert!(loaded.flwob(FlowKind::Riv).is_none());
    assert!(loaded.dis().is_some());
}

// --- Subsidence and solver ---

#[test]
fn swt_and_gmg_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut model = Model::new("swt", dir.path());
    let dis = Dis::new(2, 4, 4, 1);
    let swt = Swt::new(&dis, vec![0, 1])
        .with_ipakcb(53)
        .with_output_control(SwtOutputControl::default());
    let gmg = Gmg {
        damping: Damping::Bounded {
            dup: 0.75,
            dlow: 0.01,
            chglimit: 1.0,
        },
        iunitmhc: 1001,
        ..Gmg::default()
    };
    model.add_package(dis).unwrap();
    model.add_package(swt.clone()).unwrap();
    model.add_package(gmg.clone()).unwrap();
    assert_eq!(model.get_output(2052), Some("swt.swt_subsidence.hds"));
    assert_eq!(model.get_output(1001), Some("swt.gmg.summary"));
    model.write_input().unwrap();

    let loaded = Model::load(dir.path().join("swt.nam"), &LoadOptions::default()).unwrap();
    assert_eq!(loaded.swt(), Some(&swt));
    assert_eq!(loaded.gmg(), Some(&gmg));
    assert_eq!(loaded.units().entries().len(), model.units().entries().len());
}

#[test]
fn removing_swt_drops_its_outputs() {
    let dir = TempDir::new().unwrap();
    let mut model = Model::new("swt", dir.path());
    let dis = Dis::new(1, 2, 2, 1);
    let swt = Swt::new(&dis, vec![0]).with_output_control(SwtOutputControl::default());
    model.add_package(dis).unwrap();
    model.add_package(swt).unwrap();
    model.remove_package("SWT").unwrap();
    assert!(!model.units().is_used(2052));
    assert_eq!(model.units().len(), 1);
}

// --- Forgiving loads ---

#[test]
fn broken_package_fails_load() {
    let dir = TempDir::new().unwrap();
    hob_simple(dir.path()).write_input().unwrap();
    fs::write(dir.path().join("hob_simple.hob"), "# broken\nnot a number\n").unwrap();

    let err = Model::load(dir.path().join("hob_simple.nam"), &LoadOptions::default()).unwrap_err();
    match err {
        Error::Load { ftype, fname, .. } => {
            assert_eq!(ftype, "HOB");
            assert_eq!(fname, "hob_simple.hob");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn forgiving_load_keeps_broken_package_as_text() {
    let dir = TempDir::new().unwrap();
    hob_simple(dir.path()).write_input().unwrap();
    fs::write(dir.path().join("hob_simple.hob"), "# broken\nnot a number\n").unwrap();

    let model = Model::load(dir.path().join("hob_simple.nam"), &LoadOptions::forgiving()).unwrap();
    assert_eq!(model.load_failures().len(), 1);
    assert_eq!(model.load_failures()[0].ftype, "HOB");
    match model.package("HOB").unwrap() {
        Package::Raw(raw) => assert_eq!(raw.text, "# broken\nnot a number\n"),
        other => panic!("expected raw package, got {:?}", other.kind()),
    }
    assert_eq!(model.get_output(51), Some("hob_simple.hob.out"));
}
