use movierec_core::catalog::{build_documents, CatalogLoader};
use movierec_core::config::{FeatureSettings, StopWords};
use movierec_core::traits::Vectorizer;
use movierec_text::TfidfVectorizer;

const CSV: &str = "\
id,title,overview,genres,keywords,vote_average
1,Deep Sea,A submarine crew fights a sea monster,\"[{\"\"id\"\": 28, \"\"name\"\": \"\"Action\"\"}]\",\"[{\"\"id\"\": 5, \"\"name\"\": \"\"submarine\"\"}]\",7.1
2,Abyss Two,Submarine divers meet a monster,\"[{\"\"id\"\": 28, \"\"name\"\": \"\"Action\"\"}]\",[],6.0
3,Quiet Farm,A farmer grows wheat,\"[{\"\"id\"\": 18, \"\"name\"\": \"\"Drama\"\"}]\",[],8.0
4,Nothing,,broken,,1.0
";

fn fitted() -> (TfidfVectorizer, movierec_core::types::FeatureMatrix) {
    let catalog = CatalogLoader::new().read(CSV.as_bytes()).expect("catalog");
    let docs = build_documents(&catalog.items);
    let mut v = TfidfVectorizer::from_settings(&FeatureSettings::default()).expect("vectorizer");
    let m = v.fit_transform(&docs);
    (v, m)
}

#[test]
fn one_row_per_catalog_item_in_order() {
    let (v, m) = fitted();
    assert_eq!(m.n_rows(), 4);
    assert_eq!(m.n_cols(), v.vocabulary_size());
    let col = v.column_of("wheat").expect("wheat");
    assert!(m.row(2)[col] > 0.0);
    assert_eq!(m.row(0)[col], 0.0);
}

#[test]
fn categories_and_keywords_become_terms() {
    let (v, _) = fitted();
    assert!(v.column_of("action").is_some());
    assert!(v.column_of("drama").is_some());
    assert!(v.column_of("submarine").is_some());
    assert!(v.column_of("a").is_none());
}

#[test]
fn empty_document_is_a_zero_row() {
    let (_, m) = fitted();
    assert_eq!(m.nnz(3), 0);
}

#[test]
fn listed_stop_words_survive_only_without_filtering() {
    let docs: Vec<_> = ["The fire spreads", "fire and the system"]
        .iter()
        .map(|t| movierec_core::types::FeatureDocument::new(*t))
        .collect();

    let mut english = TfidfVectorizer::from_settings(&FeatureSettings::default()).expect("vectorizer");
    english.fit(&docs);
    assert_eq!(english.vocabulary(), &["spreads"]);

    let settings = FeatureSettings { max_features: 5000, stop_words: StopWords::None };
    let mut none = TfidfVectorizer::from_settings(&settings).expect("vectorizer");
    none.fit(&docs);
    assert_eq!(none.vocabulary(), &["and", "fire", "spreads", "system", "the"]);
}
