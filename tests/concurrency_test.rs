#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    use wordlink::prelude::*;

    const THREADS: u64 = 8;
    const CONTENTS_PER_THREAD: u64 = 25;

    fn document(content_id: ContentId) -> FullTextData {
        // Every document shares "common" and introduces words other threads
        // introduce at the same time.
        let value = format!(
            "common shared{} group{} unique{}",
            content_id % 5,
            content_id % 3,
            content_id
        );
        FullTextData::builder(content_id)
            .add_text(1, "body", value, "eng-GB")
            .build()
    }

    fn assert_refcounts(store: &MemoryIndexStore) {
        for word in store.words().unwrap() {
            let contents = store.contents_for_word(word.id).unwrap();
            assert_eq!(word.object_count, contents.len() as u64, "{}", word.text);
        }
    }

    #[test]
    fn test_concurrent_indexing_keeps_refcounts() {
        let store = Arc::new(MemoryIndexStore::new());
        let languages = Arc::new(StaticLanguageRegistry::with_languages(["eng-GB"]).unwrap());
        let indexer = Arc::new(
            SearchIndexer::new(store.clone(), languages, IndexerConfig::default()).unwrap(),
        );

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let indexer = Arc::clone(&indexer);
                thread::spawn(move || {
                    for i in 0..CONTENTS_PER_THREAD {
                        let content_id = t * CONTENTS_PER_THREAD + i + 1;
                        indexer.index(&document(content_id)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = THREADS * CONTENTS_PER_THREAD;
        let words = store.words().unwrap();
        let texts: BTreeSet<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts.len(), words.len(), "duplicate dictionary rows");

        assert_eq!(store.word("common").unwrap().unwrap().object_count, total);
        assert_eq!(words.len() as u64, 1 + 5 + 3 + total);
        assert_refcounts(&store);
    }

    #[test]
    fn test_concurrent_index_and_remove() {
        let store = Arc::new(MemoryIndexStore::new());
        let languages = Arc::new(StaticLanguageRegistry::with_languages(["eng-GB"]).unwrap());
        let indexer = Arc::new(
            SearchIndexer::new(store.clone(), languages, IndexerConfig::default()).unwrap(),
        );

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let indexer = Arc::clone(&indexer);
                thread::spawn(move || {
                    for i in 0..CONTENTS_PER_THREAD {
                        let content_id = t * CONTENTS_PER_THREAD + i + 1;
                        indexer.index(&document(content_id)).unwrap();
                        if content_id % 2 == 0 {
                            indexer.remove(content_id, None).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let remaining = THREADS * CONTENTS_PER_THREAD / 2;
        assert_eq!(store.word("common").unwrap().unwrap().object_count, remaining);
        assert!(store.word("unique2").unwrap().is_none());
        assert!(store.word("unique1").unwrap().is_some());
        assert_refcounts(&store);
    }
}
