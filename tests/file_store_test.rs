#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;
    use wordlink::prelude::*;

    fn indexer(store: Arc<FileIndexStore>) -> SearchIndexer {
        let languages = Arc::new(StaticLanguageRegistry::with_languages(["eng-GB"]).unwrap());
        SearchIndexer::new(store, languages, IndexerConfig::default()).unwrap()
    }

    fn body(content_id: ContentId, value: &str) -> FullTextData {
        FullTextData::builder(content_id)
            .published(true)
            .add_text(1, "body", value, "eng-GB")
            .build()
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = Arc::new(FileIndexStore::open(&path).unwrap());
            let indexer = indexer(store);
            indexer.index(&body(1, "durable words")).unwrap();
            indexer.index(&body(2, "more durable words")).unwrap();
            indexer.remove(1, None).unwrap();
        }

        let store = Arc::new(FileIndexStore::open(&path).unwrap());
        assert_eq!(store.word("durable").unwrap().unwrap().object_count, 1);
        assert_eq!(store.links_for_content(2).unwrap().len(), 3);
        assert!(store.links_for_content(1).unwrap().is_empty());

        let indexer = indexer(store.clone());
        let stats = indexer.index(&body(3, "durable")).unwrap();
        assert_eq!(stats.new_words, 0);
        assert_eq!(store.word("durable").unwrap().unwrap().object_count, 2);
    }

    #[test]
    fn test_failed_index_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = Arc::new(FileIndexStore::open(&path).unwrap());
            let indexer = indexer(store);
            indexer.index(&body(1, "committed")).unwrap();

            let bad = FullTextData::builder(2)
                .add_text(1, "body", "lost", "ger-DE")
                .build();
            assert!(indexer.index(&bad).is_err());
        }

        let store = FileIndexStore::open(&path).unwrap();
        assert!(store.word("committed").unwrap().is_some());
        assert!(store.word("lost").unwrap().is_none());
        assert_eq!(store.link_count().unwrap(), 1);
    }

    #[test]
    fn test_purge_persists_empty_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = Arc::new(FileIndexStore::open(&path).unwrap());
            let indexer = indexer(store);
            indexer.index(&body(1, "temporary")).unwrap();
            indexer.purge_index().unwrap();
        }

        let store = FileIndexStore::open(&path).unwrap();
        assert_eq!(store.word_count().unwrap(), 0);
        assert_eq!(store.link_count().unwrap(), 0);
    }
}
