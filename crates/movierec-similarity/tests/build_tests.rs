use std::fs;
use tempfile::TempDir;

use movierec_core::config::FeatureSettings;
use movierec_core::error::Error;
use movierec_core::traits::Ranker;
use movierec_similarity::artifacts::{load_catalog, load_pair, load_similarity, save_catalog};
use movierec_similarity::{build_artifacts, ArtifactPaths, SimilarityIndex};

const CSV: &str = "\
id,title,overview,genres,keywords,vote_average
1,Deep Sea,A submarine crew fights a sea monster,\"[{\"\"id\"\": 28, \"\"name\"\": \"\"Action\"\"}]\",\"[{\"\"id\"\": 5, \"\"name\"\": \"\"submarine\"\"}]\",7.1
2,Abyss,Submarine divers meet a sea monster,\"[{\"\"id\"\": 28, \"\"name\"\": \"\"Action\"\"}, {\"\"id\"\": 12, \"\"name\"\": \"\"Adventure\"\"}]\",[],6.0
3,Quiet Farm,A farmer grows wheat,\"[{\"\"id\"\": 18, \"\"name\"\": \"\"Drama\"\"}]\",[],8.0
4,Nothing,,broken,,1.0
";

fn build(tmp: &TempDir) -> ArtifactPaths {
    let csv = tmp.path().join("movies.csv");
    fs::write(&csv, CSV).unwrap();
    let paths = ArtifactPaths::new(tmp.path().join("out/movies.bin"), tmp.path().join("out/sim.bin"));
    let report = build_artifacts(&csv, &paths, &FeatureSettings::default()).expect("build");
    assert_eq!(report.items, 4);
    assert_eq!(report.malformed_fields, 1);
    assert_eq!(report.blank_documents, 1);
    paths
}

#[test]
fn build_then_load_round_trips() {
    let tmp = TempDir::new().unwrap();
    let paths = build(&tmp);

    let (records, matrix) = load_pair(&paths).expect("load");
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(records[1].categories, vec!["Action", "Adventure"]);

    let again = load_similarity(&paths.similarity).unwrap();
    let bits = |m: &movierec_similarity::SimilarityMatrix| m.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&matrix), bits(&again));

    save_catalog(&tmp.path().join("copy.bin"), &records).unwrap();
    assert_eq!(load_catalog(&tmp.path().join("copy.bin")).unwrap(), records);
}

#[test]
fn built_matrix_satisfies_similarity_properties() {
    let tmp = TempDir::new().unwrap();
    let (records, matrix) = load_pair(&build(&tmp)).unwrap();
    let index = SimilarityIndex::new(records, matrix).unwrap();

    for i in 0..index.len() {
        assert_eq!(index.similarity(i, i).unwrap(), 1.0);
        for j in 0..index.len() {
            assert_eq!(index.similarity(i, j).unwrap().to_bits(), index.similarity(j, i).unwrap().to_bits());
        }
    }
    assert_eq!(index.similarity(3, 0).unwrap(), 0.0);
    assert_eq!(index.nearest_neighbors(0, 1).unwrap(), vec![1]);
    assert_eq!(index.nearest_neighbors(0, 10).unwrap().len(), 3);
}

#[test]
fn category_queries_on_built_catalog() {
    let tmp = TempDir::new().unwrap();
    let (records, matrix) = load_pair(&build(&tmp)).unwrap();
    let index = SimilarityIndex::new(records, matrix).unwrap();
    let both = vec!["Action".to_string(), "Adventure".to_string()];
    assert_eq!(index.top_ranked_by_category(&both, 10), vec![1]);
    assert_eq!(index.top_ranked_by_category(&["Action".to_string()], 10), vec![0, 1]);
}

#[test]
fn missing_catalog_fails_the_build() {
    let tmp = TempDir::new().unwrap();
    let paths = ArtifactPaths::new(tmp.path().join("a.bin"), tmp.path().join("b.bin"));
    let err = build_artifacts(&tmp.path().join("absent.csv"), &paths, &FeatureSettings::default()).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::CatalogLoad { .. })));
    assert!(!paths.catalog.exists());
}

#[test]
fn mismatched_artifacts_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let paths = build(&tmp);
    let (records, _) = load_pair(&paths).unwrap();
    save_catalog(&paths.catalog, &records[..2]).unwrap();
    assert!(matches!(load_pair(&paths), Err(Error::Artifact(_))));
}

#[test]
fn failed_rebuild_keeps_the_previous_pair() {
    let tmp = TempDir::new().unwrap();
    let paths = build(&tmp);

    let reversed: String = {
        let mut lines: Vec<&str> = CSV.lines().collect();
        lines[1..].reverse();
        lines.join("\n") + "\n"
    };
    let csv = tmp.path().join("reversed.csv");
    fs::write(&csv, reversed).unwrap();
    // a directory where the similarity staging file would go
    let mut blocked = paths.similarity.clone().into_os_string();
    blocked.push(".tmp");
    fs::create_dir_all(&blocked).unwrap();

    assert!(build_artifacts(&csv, &paths, &FeatureSettings::default()).is_err());

    let (records, matrix) = load_pair(&paths).expect("previous pair still loads");
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(matrix.get(3, 2), Some(0.0));
    let mut catalog_tmp = paths.catalog.clone().into_os_string();
    catalog_tmp.push(".tmp");
    assert!(!std::path::Path::new(&catalog_tmp).exists());
}

#[test]
fn stale_similarity_next_to_new_catalog_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let paths = build(&tmp);
    let (records, _) = load_pair(&paths).unwrap();
    let reversed: Vec<_> = records.into_iter().rev().collect();
    save_catalog(&paths.catalog, &reversed).unwrap();
    assert!(matches!(load_pair(&paths), Err(Error::Artifact(_))));
}
