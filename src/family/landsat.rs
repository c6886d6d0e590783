use toml;

pub fn family_toml() -> toml::Table {
    toml::toml! {
        name = "landsat"

        description = "Landsat Thematic Mapper, Enhanced Thematic Mapper Plus and Operational Land\n\
        Imager scenes, archived by WRS-2 path/row. Tile ids are the zero-padded path and row\n\
        (PPPRRR). Processed products are derived from the Level 1 scene archives."

        root = "/data/landsat/tiles"

        extension = "tif"

        tile_width = 6

        [tiles]
        vector = "/data/landsat/wrs2_descending.geojson"
        attribute = "PR"

        [[sensors]]
        code = "LT5"
        name = "Landsat 5"
        raw = "^LT5(?<tile>[0-9]{6})(?<date>[0-9]{7}).*\\.tar\\.gz$"

        [[sensors]]
        code = "LE7"
        name = "Landsat 7"
        raw = "^LE7(?<tile>[0-9]{6})(?<date>[0-9]{7}).*\\.tar\\.gz$"

        [[sensors]]
        code = "LC8"
        name = "Landsat 8"
        raw = "^LC8(?<tile>[0-9]{6})(?<date>[0-9]{7}).*\\.tar\\.gz$"

        [[products]]
        id = "rad"
        description = "At-sensor radiance"

        [[products]]
        id = "ref"
        description = "Surface reflectance"

        [[products]]
        id = "toaref"
        description = "Top of atmosphere reflectance"

        [[products]]
        id = "ndvi"
        description = "Normalized Difference Vegetation Index"

        [[products]]
        id = "evi"
        description = "Enhanced Vegetation Index"

        [[products]]
        id = "lswi"
        description = "Land Surface Water Index"

        [[products]]
        id = "ndsi"
        description = "Normalized Difference Snow Index"

        [[products]]
        id = "satvi"
        description = "Soil-Adjusted Total Vegetation Index"

        [processor]
        process = ["gip_landsat", "process", "--input", "{input_dir}", "--sensor", "{sensor}", "--product", "{product}", "--output", "{output}"]
        overviews = ["--overviews"]
        project = ["gip_landsat", "project", "--date", "{date}", "--sensor", "{sensor}", "--product", "{product}", "--res", "{res}", "--output", "{output}", "{inputs}"]
    }
}
