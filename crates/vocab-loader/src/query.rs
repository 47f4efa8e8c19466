//! Read-side queries over a catalog: search, listings with usage counts,
//! ancestor ranking, fuzzy name/label resolution and localized ancestry.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use vocab_types::{well_known, Term, TermId};

use crate::extras::{DocumentSource, UsageIndex};
use crate::store::VocabularyCatalog;
use crate::types::VocabResult;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Term id.
    pub id: TermId,
    /// Canonical term name.
    pub name: String,
    /// Label in the requested language, or the name.
    pub label: String,
}

/// A page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Results within the requested window.
    pub results: Vec<SearchHit>,
    /// Size of the full match set.
    pub total: usize,
}

/// Filters applied by [`VocabularyCatalog::list_terms`].
#[derive(Debug, Clone, Default)]
pub struct TermFilter {
    /// Keep only terms at this depth.
    pub depth: Option<u32>,
    /// Keep only direct children of this term.
    pub parent: Option<String>,
    /// Keep only terms used by at least this many documents.
    /// Ignored unless usage counting is requested.
    pub min_usage: Option<usize>,
}

/// Ordering of term listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOrder {
    /// By canonical name.
    Name,
    /// By display label, then name.
    Label,
    /// By materialized path.
    Path,
    /// By usage count descending, then name.
    UsageDesc,
}

/// Options for [`VocabularyCatalog::list_terms`].
#[derive(Clone, Default)]
pub struct ListOptions<'a> {
    /// Document extras to count usage against; `None` skips counting.
    pub usage: Option<&'a dyn DocumentSource>,
    /// Row filters.
    pub filter: TermFilter,
    /// Explicit ordering. Defaults to usage when counting, name otherwise.
    pub order: Option<TermOrder>,
}

/// One row of a term listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermListing {
    /// Term id.
    pub id: TermId,
    /// Canonical term name.
    pub name: String,
    /// Label in the requested language, or the name.
    pub label: String,
    /// Depth in the tree.
    pub depth: u32,
    /// Distinct active documents referencing the term, when requested.
    pub usage_count: Option<usize>,
}

/// A top-level term ranked by the usage of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorRank {
    /// Top-level term name.
    pub name: String,
    /// Distinct active documents referencing any direct child.
    pub usage_count: usize,
    /// Label in the requested language, or the name.
    pub label: String,
}

/// How well a candidate matched a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchStrength {
    /// Only a label matched.
    Label,
    /// Only the canonical name matched.
    Name,
    /// Both the canonical name and a label matched.
    NameAndLabel,
}

/// A term matched by [`VocabularyCatalog::resolve_term_or_label`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    /// Term id.
    pub id: TermId,
    /// Canonical term name.
    pub name: String,
    /// Best strength over all candidates.
    pub strength: MatchStrength,
}

impl VocabularyCatalog {
    /// Searches a vocabulary for terms whose label in `lang` (or name, when
    /// there is no such label) contains `query` ignoring case, or whose name
    /// equals `query`.
    ///
    /// Results are ordered by name then label; `total` counts all matches.
    pub fn search(
        &self,
        vocabulary: &str,
        lang: &str,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> VocabResult<SearchPage> {
        let vocabulary = self.vocabulary(vocabulary)?;
        let query = query.trim();
        let needle = query.to_lowercase();

        let mut hits: Vec<SearchHit> = self
            .terms(vocabulary.id)
            .filter_map(|term| {
                let label = self.label_for(term.id, lang);
                let matches = term.name == query
                    || match label {
                        Some(label) => label.contains_ignore_case(query),
                        None => term.name.to_lowercase().contains(&needle),
                    };
                matches.then(|| SearchHit {
                    id: term.id,
                    name: term.name.clone(),
                    label: label.map_or(term.name.as_str(), |l| l.label.as_str()).to_string(),
                })
            })
            .collect();
        hits.sort_by(|a, b| (&a.name, &a.label).cmp(&(&b.name, &b.label)));

        let total = hits.len();
        let results = hits.into_iter().skip(offset).take(limit).collect();
        Ok(SearchPage { results, total })
    }

    /// Lists the terms of a vocabulary with display labels and, optionally,
    /// usage counts from the document extras.
    ///
    /// # Errors
    /// Fails if the vocabulary or the parent filter term is unknown, and with
    /// `InvalidValue` if a document holds a malformed array.
    pub fn list_terms(
        &self,
        vocabulary: &str,
        lang: &str,
        options: &ListOptions<'_>,
    ) -> VocabResult<Vec<TermListing>> {
        let vocabulary = self.vocabulary(vocabulary)?;
        let usage = options
            .usage
            .map(|source| UsageIndex::build(source, &vocabulary.name))
            .transpose()?;
        let parent_id = match &options.filter.parent {
            Some(parent) => Some(self.term_in(vocabulary.id, parent)?.id),
            None => None,
        };

        let mut rows: Vec<(TermListing, &Term)> = Vec::new();
        for term in self.terms(vocabulary.id) {
            if options.filter.depth.is_some_and(|d| d != term.depth) {
                continue;
            }
            if parent_id.is_some() && term.parent_id != parent_id {
                continue;
            }
            let usage_count = usage.as_ref().map(|index| index.count(&term.name));
            if let (Some(min), Some(count)) = (options.filter.min_usage, usage_count) {
                if count < min {
                    continue;
                }
            }
            let listing = TermListing {
                id: term.id,
                name: term.name.clone(),
                label: self.label_or_name(term, lang).to_string(),
                depth: term.depth,
                usage_count,
            };
            rows.push((listing, term));
        }

        let default_order = if usage.is_some() {
            TermOrder::UsageDesc
        } else {
            TermOrder::Name
        };
        match options.order.unwrap_or(default_order) {
            TermOrder::Name => rows.sort_by(|a, b| a.0.name.cmp(&b.0.name)),
            TermOrder::Label => {
                rows.sort_by(|a, b| (&a.0.label, &a.0.name).cmp(&(&b.0.label, &b.0.name)))
            }
            TermOrder::Path => rows.sort_by(|a, b| a.1.path.cmp(&b.1.path)),
            TermOrder::UsageDesc => rows.sort_by(|a, b| {
                (Reverse(a.0.usage_count.unwrap_or(0)), &a.0.name)
                    .cmp(&(Reverse(b.0.usage_count.unwrap_or(0)), &b.0.name))
            }),
        }

        Ok(rows.into_iter().map(|(listing, _)| listing).collect())
    }

    /// Ranks top-level terms by the number of active documents referencing
    /// any of their direct children.
    ///
    /// Terms without any usage are left out; ties are broken by name.
    pub fn most_frequent_ancestor(
        &self,
        vocabulary: &str,
        lang: &str,
        limit: usize,
        source: &dyn DocumentSource,
    ) -> VocabResult<Vec<AncestorRank>> {
        let vocabulary = self.vocabulary(vocabulary)?;
        let usage = UsageIndex::build(source, &vocabulary.name)?;

        let mut ranks: Vec<AncestorRank> = self
            .terms(vocabulary.id)
            .filter(|term| term.is_top_level())
            .filter_map(|top| {
                let documents: BTreeSet<&str> = self
                    .children(top.id)
                    .flat_map(|child| usage.documents(&child.name))
                    .collect();
                (!documents.is_empty()).then(|| AncestorRank {
                    name: top.name.clone(),
                    usage_count: documents.len(),
                    label: self.label_or_name(top, lang).to_string(),
                })
            })
            .collect();

        ranks.sort_by(|a, b| {
            (Reverse(a.usage_count), &a.name).cmp(&(Reverse(b.usage_count), &b.name))
        });
        ranks.truncate(limit);
        Ok(ranks)
    }

    /// Matches free-text candidates against term names and labels in any
    /// language, ignoring case.
    ///
    /// Matches are ranked by strength (name and label, name only, label
    /// only), then by name.
    pub fn resolve_term_or_label<S: AsRef<str>>(
        &self,
        vocabulary: &str,
        candidates: &[S],
    ) -> VocabResult<Vec<TermMatch>> {
        let vocabulary = self.vocabulary(vocabulary)?;
        let candidates: Vec<String> = candidates
            .iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        let mut matches: Vec<TermMatch> = self
            .terms(vocabulary.id)
            .filter_map(|term| {
                let name = term.name.to_lowercase();
                let labels: Vec<String> = self
                    .labels(term.id)
                    .map(|l| l.label.to_lowercase())
                    .collect();

                candidates
                    .iter()
                    .filter_map(|candidate| {
                        let name_match = &name == candidate;
                        let label_match = labels.iter().any(|l| l == candidate);
                        match (name_match, label_match) {
                            (true, true) => Some(MatchStrength::NameAndLabel),
                            (true, false) => Some(MatchStrength::Name),
                            (false, true) => Some(MatchStrength::Label),
                            (false, false) => None,
                        }
                    })
                    .max()
                    .map(|strength| TermMatch {
                        id: term.id,
                        name: term.name.clone(),
                        strength,
                    })
            })
            .collect();

        matches.sort_by(|a, b| (Reverse(a.strength), &a.name).cmp(&(Reverse(b.strength), &b.name)));
        Ok(matches)
    }

    /// Collects the labels of the given terms and all their ancestors into
    /// facets keyed `fao_<vocabulary>_l<depth>_<lang>`.
    ///
    /// # Errors
    /// Fails with `TermNotFound` if a name is not in the vocabulary.
    pub fn localized_ancestry<S: AsRef<str>>(
        &self,
        vocabulary: &str,
        names: &[S],
    ) -> VocabResult<BTreeMap<String, BTreeSet<String>>> {
        let vocabulary = self.vocabulary(vocabulary)?;
        let mut facets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for name in names {
            let term = self.term_in(vocabulary.id, name.as_ref())?;
            let mut chain = vec![term];
            chain.extend(self.ancestors(term.id));

            for node in chain {
                for label in self.labels(node.id) {
                    let key = well_known::ancestry_facet_key(&vocabulary.name, node.depth, &label.lang);
                    facets.entry(key).or_default().insert(label.label.clone());
                }
            }
        }

        Ok(facets)
    }
}

#[cfg(test)]
mod tests {
    use vocab_types::{Labels, Properties};

    use super::*;
    use crate::extras::{DocumentExtra, DocumentExtras};

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(lang, text)| (lang.to_string(), text.to_string()))
            .collect()
    }

    /// regions: EU(Europe/Europe) > {031 Italy/Italie, 250 France}, AF(Africa) > {012 Algeria}
    fn sample_catalog() -> VocabularyCatalog {
        let mut catalog = VocabularyCatalog::new();
        let v = catalog.create_vocabulary("regions", true).unwrap();
        let eu = catalog
            .create_term(v.id, "EU", labels(&[("en", "Europe"), ("fr", "Europe")]), None, Properties::new())
            .unwrap();
        let af = catalog
            .create_term(v.id, "AF", labels(&[("en", "Africa")]), None, Properties::new())
            .unwrap();
        catalog
            .create_term(v.id, "031", labels(&[("en", "Italy"), ("fr", "Italie")]), Some(eu.id), Properties::new())
            .unwrap();
        catalog
            .create_term(v.id, "250", labels(&[("en", "France")]), Some(eu.id), Properties::new())
            .unwrap();
        catalog
            .create_term(v.id, "012", labels(&[("en", "Algeria")]), Some(af.id), Properties::new())
            .unwrap();
        catalog
    }

    fn sample_documents() -> DocumentExtras {
        let mut withdrawn = DocumentExtra::active("d9", "fao_regions", "{012}");
        withdrawn.state = "deleted".to_string();
        vec![
            DocumentExtra::active("d1", "fao_regions", "{031,250}"),
            DocumentExtra::active("d2", "fao_regions", "{031}"),
            DocumentExtra::active("d3", "fao_regions", "012"),
            DocumentExtra::active("d4", "fao_other", "{250}"),
            withdrawn,
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_search_label_and_fallback() {
        let catalog = sample_catalog();

        let en = catalog.search("regions", "en", "ita", 0, 10).unwrap();
        assert_eq!(en.total, 1);
        assert_eq!(en.results[0].label, "Italy");

        let fr = catalog.search("regions", "fr", "ITA", 0, 10).unwrap();
        assert_eq!(fr.results[0].label, "Italie");

        // no French label: the name stands in for matching and display
        let fallback = catalog.search("regions", "fr", "alg", 0, 10).unwrap();
        assert_eq!(fallback.total, 0);
        let by_name = catalog.search("regions", "fr", "01", 0, 10).unwrap();
        assert_eq!(by_name.results[0].name, "012");
        assert_eq!(by_name.results[0].label, "012");
    }

    #[test]
    fn test_search_exact_name_and_paging() {
        let catalog = sample_catalog();

        let exact = catalog.search("regions", "en", "250", 0, 10).unwrap();
        assert_eq!(exact.total, 1);
        assert_eq!(exact.results[0].label, "France");

        let all = catalog.search("regions", "en", "", 1, 2).unwrap();
        assert_eq!(all.total, 5);
        let names: Vec<&str> = all.results.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["031", "250"]);
    }

    #[test]
    fn test_search_unknown_vocabulary() {
        let catalog = sample_catalog();
        let err = catalog.search("nope", "en", "x", 0, 10).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_terms_without_usage() {
        let catalog = sample_catalog();
        let rows = catalog
            .list_terms("regions", "fr", &ListOptions::default())
            .unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["012", "031", "250", "AF", "EU"]);
        assert!(rows.iter().all(|r| r.usage_count.is_none()));
        assert_eq!(rows[0].label, "012");
        assert_eq!(rows[1].label, "Italie");
        assert_eq!(rows[1].depth, 1);
    }

    #[test]
    fn test_list_terms_with_usage() {
        let catalog = sample_catalog();
        let documents = sample_documents();
        let options = ListOptions {
            usage: Some(&documents),
            ..Default::default()
        };

        let rows = catalog.list_terms("regions", "en", &options).unwrap();
        let counts: Vec<(&str, usize)> = rows
            .iter()
            .map(|r| (r.name.as_str(), r.usage_count.unwrap()))
            .collect();
        assert_eq!(
            counts,
            vec![("031", 2), ("012", 1), ("250", 1), ("AF", 0), ("EU", 0)]
        );
    }

    #[test]
    fn test_list_terms_filters_and_order() {
        let catalog = sample_catalog();
        let documents = sample_documents();

        let children = catalog
            .list_terms(
                "regions",
                "en",
                &ListOptions {
                    filter: TermFilter {
                        parent: Some("EU".to_string()),
                        ..Default::default()
                    },
                    order: Some(TermOrder::Label),
                    ..Default::default()
                },
            )
            .unwrap();
        let labels: Vec<&str> = children.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["France", "Italy"]);

        let used = catalog
            .list_terms(
                "regions",
                "en",
                &ListOptions {
                    usage: Some(&documents),
                    filter: TermFilter {
                        min_usage: Some(1),
                        depth: Some(1),
                        ..Default::default()
                    },
                    order: Some(TermOrder::Path),
                },
            )
            .unwrap();
        let names: Vec<&str> = used.iter().map(|r| r.name.as_str()).collect();
        // paths AF/012, EU/031, EU/250
        assert_eq!(names, vec!["012", "031", "250"]);
    }

    #[test]
    fn test_most_frequent_ancestor() {
        let catalog = sample_catalog();
        let documents = sample_documents();

        let ranks = catalog
            .most_frequent_ancestor("regions", "en", 10, &documents)
            .unwrap();
        assert_eq!(
            ranks,
            vec![
                AncestorRank {
                    name: "EU".to_string(),
                    usage_count: 2,
                    label: "Europe".to_string(),
                },
                AncestorRank {
                    name: "AF".to_string(),
                    usage_count: 1,
                    label: "Africa".to_string(),
                },
            ]
        );

        let top = catalog
            .most_frequent_ancestor("regions", "en", 1, &documents)
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "EU");
    }

    #[test]
    fn test_resolve_term_or_label() {
        let mut catalog = sample_catalog();
        let v = catalog.vocabulary("regions").unwrap().id;
        catalog
            .create_term(v, "Italy", Labels::new(), None, Properties::new())
            .unwrap();
        catalog
            .create_term(v, "Chad", labels(&[("en", "Chad")]), None, Properties::new())
            .unwrap();

        let matches = catalog
            .resolve_term_or_label("regions", &["italy", " CHAD "])
            .unwrap();
        let ranked: Vec<(&str, MatchStrength)> = matches
            .iter()
            .map(|m| (m.name.as_str(), m.strength))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("Chad", MatchStrength::NameAndLabel),
                ("Italy", MatchStrength::Name),
                ("031", MatchStrength::Label),
            ]
        );
    }

    #[test]
    fn test_localized_ancestry() {
        let catalog = sample_catalog();
        let facets = catalog.localized_ancestry("regions", &["031", "250"]).unwrap();

        let l0_en: Vec<&str> = facets["fao_regions_l0_en"].iter().map(String::as_str).collect();
        assert_eq!(l0_en, vec!["Europe"]);
        let l1_en: Vec<&str> = facets["fao_regions_l1_en"].iter().map(String::as_str).collect();
        assert_eq!(l1_en, vec!["France", "Italy"]);
        let l1_fr: Vec<&str> = facets["fao_regions_l1_fr"].iter().map(String::as_str).collect();
        assert_eq!(l1_fr, vec!["Italie"]);

        assert!(catalog.localized_ancestry("regions", &["XX"]).is_err());
    }
}
