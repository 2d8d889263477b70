//! Data-fetch contracts consumed by the viewer.
//!
//! Transport is someone else's concern; these traits are the seam. All calls
//! are blocking and are expected to honour the timeout they are given.

use crate::error::FetchResult;
use crate::model::{
    LinkAnnotation, PageNumber, RasterPayload, SearchRequest, SearchResponse, TextLayout,
};
use std::time::Duration;

pub trait RasterSource {
    fn fetch_raster(&self, page: PageNumber, timeout: Duration) -> FetchResult<RasterPayload>;
}

pub trait TextLayoutSource {
    fn fetch_text_layout(&self, page: PageNumber) -> FetchResult<TextLayout>;
}

pub trait LinkSource {
    fn fetch_links(&self, page: PageNumber) -> FetchResult<Vec<LinkAnnotation>>;
}

pub trait SearchSource {
    fn search(&self, request: &SearchRequest) -> FetchResult<SearchResponse>;
}

/// Everything a page view needs from one backend
pub trait PageSource: RasterSource + TextLayoutSource + LinkSource {}

impl<T: RasterSource + TextLayoutSource + LinkSource> PageSource for T {}

impl<T: RasterSource + ?Sized> RasterSource for &T {
    fn fetch_raster(&self, page: PageNumber, timeout: Duration) -> FetchResult<RasterPayload> {
        (**self).fetch_raster(page, timeout)
    }
}

impl<T: TextLayoutSource + ?Sized> TextLayoutSource for &T {
    fn fetch_text_layout(&self, page: PageNumber) -> FetchResult<TextLayout> {
        (**self).fetch_text_layout(page)
    }
}

impl<T: LinkSource + ?Sized> LinkSource for &T {
    fn fetch_links(&self, page: PageNumber) -> FetchResult<Vec<LinkAnnotation>> {
        (**self).fetch_links(page)
    }
}

impl<T: SearchSource + ?Sized> SearchSource for &T {
    fn search(&self, request: &SearchRequest) -> FetchResult<SearchResponse> {
        (**self).search(request)
    }
}
