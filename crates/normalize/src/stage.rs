use crate::action::CrudActionList;
use crate::error::Result;
use crate::glossary::TermGlossary;
use crate::request::NormalizationRequest;

/// Anything that turns requests into CRUD actions: heuristics, a model, a test double.
pub trait NormalizeStage {
    fn normalize(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> Result<CrudActionList>;
}

impl<T: NormalizeStage + ?Sized> NormalizeStage for &T {
    fn normalize(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> Result<CrudActionList> {
        (**self).normalize(requests, default_service, glossary_overrides)
    }
}

impl<T: NormalizeStage + ?Sized> NormalizeStage for Box<T> {
    fn normalize(
        &self,
        requests: &[NormalizationRequest],
        default_service: Option<&str>,
        glossary_overrides: Option<&TermGlossary>,
    ) -> Result<CrudActionList> {
        (**self).normalize(requests, default_service, glossary_overrides)
    }
}
