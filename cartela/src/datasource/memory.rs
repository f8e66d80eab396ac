use cartela_types::Box2d;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use super::{
    Datasource, DatasourceDescriptor, DatasourceError, DatasourceGeometryType, FeatureSet,
    FieldType, Query,
};
use crate::feature::Feature;

type IndexedBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Datasource holding its features in memory, indexed by their bounding boxes.
pub struct MemoryDatasource {
    features: Vec<Feature>,
    index: RTree<IndexedBox>,
    descriptor: DatasourceDescriptor,
    envelope: Box2d,
}

impl std::fmt::Debug for MemoryDatasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatasource")
            .field("features", &self.features.len())
            .field("envelope", &self.envelope)
            .finish()
    }
}

impl MemoryDatasource {
    /// Creates a datasource with the given features. The schema is derived from the attribute
    /// values: the first non-null value of a field defines its type.
    pub fn new(features: Vec<Feature>) -> Self {
        let mut entries = vec![];
        let mut envelope = Box2d::empty();
        for (i, feature) in features.iter().enumerate() {
            let bbox = feature.bounding_box();
            if !bbox.is_valid() {
                continue;
            }

            envelope.expand_to_include_box(&bbox);
            entries.push(IndexedBox::new(
                Rectangle::from_corners([bbox.minx, bbox.miny], [bbox.maxx, bbox.maxy]),
                i,
            ));
        }

        Self {
            descriptor: describe(&features),
            index: RTree::bulk_load(entries),
            features,
            envelope,
        }
    }

    /// Number of features in the datasource.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if the datasource has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn describe(features: &[Feature]) -> DatasourceDescriptor {
    let mut fields: Vec<(String, FieldType)> = vec![];
    let mut geometry_type = None;
    for feature in features {
        for geometry in feature.geometries() {
            let kind = match geometry.geometry_type() {
                cartela_types::GeometryType::Point => DatasourceGeometryType::Point,
                cartela_types::GeometryType::LineString => DatasourceGeometryType::Line,
                cartela_types::GeometryType::Polygon => DatasourceGeometryType::Polygon,
            };
            geometry_type = match geometry_type {
                None => Some(kind),
                Some(prev) if prev == kind => Some(prev),
                Some(_) => Some(DatasourceGeometryType::Collection),
            };
        }

        let mut names: Vec<_> = feature.attributes().keys().collect();
        names.sort();
        for name in names {
            if fields.iter().any(|(n, _)| n == name) {
                continue;
            }
            if let Some(field_type) = feature.get(name).and_then(FieldType::of) {
                fields.push((name.clone(), field_type));
            }
        }
    }

    DatasourceDescriptor {
        geometry_type,
        fields,
    }
}

impl Datasource for MemoryDatasource {
    fn describe(&self) -> DatasourceDescriptor {
        self.descriptor.clone()
    }

    fn envelope(&self) -> Box2d {
        self.envelope
    }

    fn features(&self, query: &Query) -> Result<FeatureSet<'_>, DatasourceError> {
        let bbox = query.bbox;
        if !bbox.is_valid() {
            return Ok(Box::new(std::iter::empty()));
        }

        let envelope = AABB::from_corners([bbox.minx, bbox.miny], [bbox.maxx, bbox.maxy]);
        let mut indices: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        indices.sort_unstable();

        let attributes = query.attributes.clone();
        Ok(Box::new(indices.into_iter().map(move |i| {
            let mut feature = self.features[i].clone();
            feature.retain_attributes(|name| attributes.contains(name));
            Ok(feature)
        })))
    }

    fn all_features(&self) -> Result<FeatureSet<'_>, DatasourceError> {
        Ok(Box::new(self.features.iter().cloned().map(Ok)))
    }
}
