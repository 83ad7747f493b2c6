//! Test query generation from the document catalog.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::types::{Document, Query, QueryKind};

/// Builds abstract-reconstruction queries: the abstract is both the query and
/// the reference answer, and the source document is the only relevant id.
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    seed: u64,
}

impl QueryGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Up to `num_queries` queries. When fewer queries than documents are
    /// requested, documents are sampled with the seeded RNG; otherwise every
    /// document is used in catalog order. Documents with blank abstracts are
    /// skipped.
    pub fn generate(&self, documents: &[Document], num_queries: usize) -> Vec<Query> {
        let usable: Vec<&Document> = documents
            .iter()
            .filter(|d| !d.abstract_text.trim().is_empty())
            .collect();

        let selected: Vec<&Document> = if num_queries >= usable.len() {
            usable
        } else {
            let mut rng = StdRng::seed_from_u64(self.seed);
            usable
                .choose_multiple(&mut rng, num_queries)
                .copied()
                .collect()
        };

        selected.into_iter().map(abstract_query).collect()
    }
}

fn abstract_query(document: &Document) -> Query {
    Query {
        query: document.abstract_text.clone(),
        reference: document.abstract_text.clone(),
        document_id: document.id.clone(),
        title: document.title.clone(),
        kind: QueryKind::AbstractReconstruction,
    }
}
